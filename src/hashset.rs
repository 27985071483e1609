//! #   The HashSet.
//!
//! The `HashSet` is the concurrent equivalent of the standard `HashSet`: any
//! number of threads may insert, remove, and look-up elements concurrently,
//! without external synchronization.
//!
//! ##  Under the covers.
//!
//! Under the covers the `HashSet` is an array of buckets, each the head of a
//! singly linked chain of nodes, and an array of lock stripes, each guarding
//! the buckets whose index is congruent to its own modulo the number of
//! stripes.
//!
//! The main consequences are:
//!
//! -   Writers only block writers of the same stripe, and readers never block.
//! -   Growing the table blocks all writers, for a duration proportional to
//!     the number of elements.
//! -   Counting, clearing, and copying block all writers as well, as they
//!     require a consistent view of the whole table.
//!
//! The number of stripes is either fixed at construction, when a concurrency
//! level is specified, or grows along with the table, up to 1024.
//!
//! #   Example: basic
//!
//! ```
//! use striped::hashset::HashSet;
//!
//! let set: HashSet<_> = HashSet::new();
//!
//! assert!(set.insert("Palmer"));
//! assert!(!set.insert("Palmer"));
//! assert_eq!(1, set.len());
//!
//! assert!(set.remove(&"Palmer"));
//! assert!(!set.remove(&"Palmer"));
//! assert_eq!(0, set.len());
//! ```
//!
//! #   Example: accessing elements
//!
//! Elements are reclaimed lazily, once no thread may still observe them, hence
//! borrowing an element requires pinning a `Guard` first.
//!
//! ```
//! use striped::hashset::HashSet;
//!
//! let set: HashSet<_> = [1, 2, 3].iter().copied().collect();
//!
//! let guard = set.guard();
//! assert_eq!(Some(&2), set.get(&2, &guard));
//! assert_eq!(None, set.get(&4, &guard));
//!
//! let mut elements: Vec<_> = set.iter(&guard).copied().collect();
//! elements.sort();
//! assert_eq!(vec![1, 2, 3], elements);
//! ```
//!
//! #   Example: sharing is caring
//!
//! ```
//! use striped::hashset::HashSet;
//!
//! let set: HashSet<_> = HashSet::with_concurrency_level(4, 31);
//!
//! crossbeam_utils::thread::scope(|scope| {
//!     for t in 0..4 {
//!         let set = &set;
//!         scope.spawn(move |_| {
//!             for i in 0..250 {
//!                 set.insert(t * 250 + i);
//!             }
//!         });
//!     }
//! }).unwrap();
//!
//! assert_eq!(1000, set.len());
//! assert!((0..1000).all(|i| set.contains(&i)));
//! ```

pub mod iterator;

mod hashset;

pub use super::comparer::{Comparer, DefaultComparer};
pub use self::hashset::HashSet;
pub use self::iterator::Iter;

pub use crossbeam_epoch::Guard;

use super::comparer;
use super::failure;
use super::hashcore;
use super::utils::atomic;
use super::utils::stripes;
