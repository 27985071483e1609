//! Comparers of the HashSet.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

/// Comparer
///
/// There are three important hooks for a HashSet:
/// -   The hashing algorithm.
/// -   The equality of two elements.
/// -   The validity of an element, checked before any operation involving it.
///
/// Two elements which compare equal must have the same hash.
///
/// Also see DefaultComparer for the default.
pub trait Comparer<T> {
    /// Returns the hash of `value`.
    fn hash(&self, value: &T) -> u64;

    /// Returns whether `left` and `right` are equal.
    fn eq(&self, left: &T, right: &T) -> bool;

    /// Returns whether `value` may be stored in, or looked up in, a HashSet.
    ///
    /// By default, all values are valid.
    fn is_valid(&self, _value: &T) -> bool { true }
}

/// DefaultComparer
///
/// Default comparer for the HashSet:
/// -   hashing with `S`, by default `RandomState`.
/// -   comparing with `Eq`.
#[derive(Clone, Debug, Default)]
pub struct DefaultComparer<S = RandomState>(S);

impl<S> DefaultComparer<S> {
    /// Creates an instance hashing with `hasher`.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use std::collections::hash_map::RandomState;
    /// #   use striped::comparer::{Comparer, DefaultComparer};
    /// let comparer = DefaultComparer::with_hasher(RandomState::new());
    ///
    /// assert_eq!(comparer.hash(&"Palmer"), comparer.hash(&"Palmer"));
    /// assert!(comparer.eq(&"Palmer", &"Palmer"));
    /// ```
    pub fn with_hasher(hasher: S) -> Self { Self(hasher) }

    /// Returns the hasher.
    pub fn hasher(&self) -> &S { &self.0 }
}

impl<T, S> Comparer<T> for DefaultComparer<S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn hash(&self, value: &T) -> u64 { self.0.hash_one(value) }

    fn eq(&self, left: &T, right: &T) -> bool { left == right }
}

//  mod tests
