//  Lints
#![allow(clippy::module_inception)]

//! #   The Striped Library
//!
//! A concurrent, lock-striped, hash-based set.
//! -   The `HashSet`: a `HashSet` which any number of threads may insert into,
//!     remove from, and look-up into concurrently.
//!
//! Writers only contend with writers of the same stripe, while readers and
//! iterators never block, in exchange for weakly consistent views.

pub mod comparer;
pub mod failure;
pub mod hashset;

mod hashcore;
mod utils;
