//! Internal utilities.

pub mod atomic;
pub mod stripes;

#[cfg(test)]
pub mod tester;
