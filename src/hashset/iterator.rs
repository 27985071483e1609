//! The iterator over HashSet.
//!
//! The `Iter` is weakly consistent: it walks the buckets of the generation
//! current when it starts, never taking a lock, and never failing whatever the
//! concurrent modifications.

use std::iter;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{Atomic, Guard, Shared};

use super::hashcore::node::Node;
use super::hashcore::tables::{self, Tables};

/// `Iter`
///
/// An iterator over the elements of a `HashSet`, created by `HashSet::iter`.
///
/// #   Consistency
///
/// -   Each element yielded was present at some point during the iteration.
/// -   No element is yielded twice by a single pass.
/// -   Elements inserted or removed during the iteration may or may not be
///     yielded.
///
/// #   Iteration order
///
/// The order in which elements are iterated on is not the order in which they
/// were inserted, and changes as the table grows.
pub struct Iter<'g, T> {
    tables: &'g Atomic<Tables<T>>,
    guard: &'g Guard,
    //  The buckets being walked, captured on the first call to `next`.
    buckets: Option<&'g [Atomic<Node<T>>]>,
    //  The index of the next bucket to walk.
    index: usize,
    //  The next node to yield, within the current bucket.
    node: Shared<'g, Node<T>>,
}

impl<'g, T> Iter<'g, T> {
    //  Creates a new instance.
    pub(crate) fn new(tables: &'g Atomic<Tables<T>>, guard: &'g Guard) -> Self {
        Self { tables, guard, buckets: None, index: 0, node: Shared::null() }
    }

    /// Resets the iterator.
    ///
    /// The next call to `next` starts a new pass, over the generation current
    /// at that point.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.insert(1);
    ///
    /// let guard = set.guard();
    /// let mut iter = set.iter(&guard);
    /// assert_eq!(Some(&1), iter.next());
    /// assert_eq!(None, iter.next());
    ///
    /// set.insert(2);
    /// iter.reset();
    ///
    /// let mut elements: Vec<_> = iter.copied().collect();
    /// elements.sort();
    /// assert_eq!(vec![1, 2], elements);
    /// ```
    pub fn reset(&mut self) {
        self.buckets = None;
        self.index = 0;
        self.node = Shared::null();
    }
}

impl<'g, T> iter::Iterator for Iter<'g, T> {
    type Item = &'g T;

    fn next(&mut self) -> Option<&'g T> {
        let buckets = match self.buckets {
            Some(buckets) => buckets,
            None => {
                let (_, current) = tables::current(self.tables, self.guard);
                let buckets = &current.buckets[..];
                self.buckets = Some(buckets);
                buckets
            },
        };

        loop {
            //  Safety:
            //  -   Protected by `self.guard`, along with all the nodes of the
            //      captured generation, including those unlinked since.
            if let Some(node) = unsafe { self.node.as_ref() } {
                self.node = node.next(self.guard);
                return Some(&*node.item);
            }

            let bucket = buckets.get(self.index)?;
            self.index += 1;

            //  Acquire: the bucket stripe is not held.
            self.node = bucket.load(Ordering::Acquire, self.guard);
        }
    }
}

impl<'g, T> iter::FusedIterator for Iter<'g, T> {}

//  mod tests
