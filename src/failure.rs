//! The Failure and Result types of this library.
//!
//! Operations on the `HashSet` may fail either because an argument is outside its valid range, or because the
//! destination of a copy is too small. Any such cause is represented as a `Failure`.
//!
//! All faillible methods come in two versions:
//!
//! -   A faillible `try_xxx` version, which returns a `Result` with `Failure` as the error type.
//! -   A convenience `xxx` version, which invokes the `try_xxx` version and panics in case of error.
//!
//! The absence of an item is never a `Failure`: look-ups and removals report it as `false` or `None`.

use std::{error, fmt, result};

/// Universal Failure type of this library.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Failure {
    /// The concurrency level requested is 0; at least one stripe is necessary.
    ZeroConcurrencyLevel,
    /// The item was rejected by `Comparer::is_valid`.
    InvalidItem,
    /// The number of elements cannot be calculated due to overflowing.
    ElementsOverflow,
    /// The destination cannot hold all the elements from the requested offset.
    DestinationTooSmall,
}

impl error::Error for Failure {}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Universal Result type of this library.
pub type Result<T> = result::Result<T, Failure>;

//  Panics with the `failure`.
#[cold]
#[inline(never)]
pub(crate) fn panic_from_failure(failure: Failure) -> ! {
    panic!("{}", failure);
}

//  mod tests
