//! Atomics with a pre-established memory ordering.
//!
//! Each type fixes the ordering of its loads and stores once, at definition,
//! rather than at each use: a reviewer only audits the ordering in one place.

use std::sync::atomic::{AtomicUsize, Ordering};

macro_rules! atomic {
    ($name:ident, $underlying:ident, $raw:ident, $load_ordering:expr, $store_ordering:expr) => {
        pub struct $name($underlying);

        impl $name {
            pub fn new(v: $raw) -> Self { Self($underlying::new(v)) }
            pub fn load(&self) -> $raw { self.0.load($load_ordering) }
            pub fn store(&self, v: $raw) { self.0.store(v, $store_ordering); }
        }
    }
}

//  Used for the per-stripe counts, and the budget.
//
//  The counts are only ever written with their stripe held, which provides all
//  the necessary synchronization; lock-free reads are advisory.
atomic!{ RelaxedUsize, AtomicUsize, usize, Ordering::Relaxed, Ordering::Relaxed }

impl Default for RelaxedUsize {
    fn default() -> Self { Self::new(0) }
}

//  mod tests
