//! The HashSet

use std::{cmp, fmt, iter, thread};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use tracing::{debug, trace, warn};

use super::Iter;

use super::atomic::RelaxedUsize;
use super::comparer::{Comparer, DefaultComparer};
use super::failure::{panic_from_failure, Failure, Result};
use super::hashcore::capacity::{self, DEFAULT_CAPACITY, MAX_BUCKETS, MAX_STRIPES};
use super::hashcore::node::{self, Node};
use super::hashcore::tables::{self, Tables};
use super::stripes::{self, StripeGuards};

//
//  Public Interface
//

/// `HashSet`
///
/// A thread-safe, growable, hash-based set of unique elements.
///
/// All methods take `&self`, and may be invoked concurrently from any number
/// of threads.
pub struct HashSet<T, C = DefaultComparer> {
    //  Comparer of the elements.
    comparer: C,
    //  Whether the number of stripes grows along with the table.
    grow_stripes: bool,
    //  The maximum number of elements a stripe may guard before growing the
    //  table is considered.
    //
    //  Only written with stripe 0 held, read without synchronization.
    budget: RelaxedUsize,
    //  The current generation.
    //
    //  Only replaced with all stripes held.
    tables: Atomic<Tables<T>>,
}

impl<T, C: Default> HashSet<T, C> {
    /// Creates a new instance of the `HashSet`, with as many stripes as there
    /// is available parallelism and a capacity of 31 buckets.
    ///
    /// The number of stripes grows along with the table.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<i32> = HashSet::new();
    ///
    /// assert!(set.is_empty());
    /// assert_eq!(31, set.number_buckets());
    /// ```
    pub fn new() -> Self { Self::with_comparer(C::default()) }

    /// Creates a new instance of the `HashSet`, with `concurrency_level`
    /// stripes and at least `capacity` buckets.
    ///
    /// The number of stripes is fixed for the lifetime of the instance.
    ///
    /// #   Panics
    ///
    /// Panics if `concurrency_level` is 0.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<i32> = HashSet::with_concurrency_level(4, 31);
    ///
    /// assert_eq!(4, set.number_stripes());
    /// assert_eq!(31, set.number_buckets());
    /// ```
    pub fn with_concurrency_level(concurrency_level: usize, capacity: usize) -> Self {
        Self::with_concurrency_level_and_comparer(concurrency_level, capacity, C::default())
    }

    /// Creates a new instance of the `HashSet`, with `concurrency_level`
    /// stripes and at least `capacity` buckets.
    ///
    /// The number of buckets is raised to `concurrency_level`, so that each
    /// stripe guards at least one bucket.
    ///
    /// #   Errors
    ///
    /// Returns an error if `concurrency_level` is 0.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::failure::Failure;
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<i32> = HashSet::try_with_concurrency_level(8, 2).unwrap();
    /// assert_eq!(8, set.number_buckets());
    ///
    /// let set: Result<HashSet<i32>, _> = HashSet::try_with_concurrency_level(0, 31);
    /// assert_eq!(Some(Failure::ZeroConcurrencyLevel), set.err());
    /// ```
    pub fn try_with_concurrency_level(concurrency_level: usize, capacity: usize)
        -> Result<Self>
    {
        Self::try_with_concurrency_level_and_comparer(concurrency_level, capacity, C::default())
    }
}

impl<T, C> HashSet<T, C> {
    /// Creates a new instance of the `HashSet`, with as many stripes as there
    /// is available parallelism and a capacity of 31 buckets.
    ///
    /// The number of stripes grows along with the table.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::{DefaultComparer, HashSet};
    /// let set: HashSet<i32> = HashSet::with_comparer(DefaultComparer::default());
    ///
    /// assert!(set.is_empty());
    /// ```
    pub fn with_comparer(comparer: C) -> Self {
        Self::create(default_concurrency_level(), DEFAULT_CAPACITY, true, comparer)
    }

    /// Creates a new instance of the `HashSet`, with `concurrency_level`
    /// stripes and at least `capacity` buckets.
    ///
    /// Calling this method is equivalent to calling
    /// `try_with_concurrency_level_and_comparer` and panicking on error.
    ///
    /// #   Panics
    ///
    /// Panics if `concurrency_level` is 0.
    pub fn with_concurrency_level_and_comparer(
        concurrency_level: usize,
        capacity: usize,
        comparer: C,
    )
        -> Self
    {
        Self::try_with_concurrency_level_and_comparer(concurrency_level, capacity, comparer)
            .unwrap_or_else(|failure| panic_from_failure(failure))
    }

    /// Creates a new instance of the `HashSet`, with `concurrency_level`
    /// stripes and at least `capacity` buckets.
    ///
    /// The number of stripes is fixed for the lifetime of the instance.
    ///
    /// #   Errors
    ///
    /// Returns an error if `concurrency_level` is 0.
    pub fn try_with_concurrency_level_and_comparer(
        concurrency_level: usize,
        capacity: usize,
        comparer: C,
    )
        -> Result<Self>
    {
        let concurrency_level = NonZeroUsize::new(concurrency_level)
            .ok_or(Failure::ZeroConcurrencyLevel)?;

        Ok(Self::create(concurrency_level, capacity, false, comparer))
    }

    /// Returns the comparer used to hash and compare elements.
    pub fn comparer(&self) -> &C { &self.comparer }

    /// Pins the current thread, returning a `Guard`.
    ///
    /// Elements borrowed from the instance remain valid as long as the `Guard`
    /// they were borrowed with is alive, even if removed concurrently.
    ///
    /// Pinning is cheap, but a long-lived `Guard` delays the reclamation of
    /// removed elements.
    pub fn guard(&self) -> Guard { epoch::pin() }

    /// Returns the number of buckets of the current table.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::with_concurrency_level(1, 31);
    /// assert_eq!(31, set.number_buckets());
    ///
    /// set.extend(0..32);
    /// assert_eq!(67, set.number_buckets());
    /// ```
    pub fn number_buckets(&self) -> usize {
        let guard = &epoch::pin();
        tables::current(&self.tables, guard).1.buckets.len()
    }

    /// Returns the number of stripes of the current table.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<i32> = HashSet::with_concurrency_level(3, 31);
    /// assert_eq!(3, set.number_stripes());
    /// ```
    pub fn number_stripes(&self) -> usize {
        let guard = &epoch::pin();
        tables::current(&self.tables, guard).1.stripes.len()
    }

    /// Returns the number of elements contained in the instance.
    ///
    /// The count is exact at some point during the call, for which all the
    /// stripes are acquired: this blocks all writers for the duration.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// assert_eq!(0, set.len());
    ///
    /// set.insert(1);
    /// assert_eq!(1, set.len());
    /// ```
    pub fn len(&self) -> usize {
        let guard = &epoch::pin();
        let (_locks, shared) = self.lock_all(guard);

        //  Safety:
        //  -   Protected by `guard`.
        let current = unsafe { shared.deref() };

        //  The size cannot overflow, as each element is a distinct allocation.
        current.try_size()
            .map(|size| size.0)
            .unwrap_or_else(|failure| panic_from_failure(failure))
    }

    /// Returns whether the instance contains any element, or not.
    ///
    /// Only acquires all stripes if no stripe appears to guard any element.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// assert!(set.is_empty());
    ///
    /// set.insert(1);
    /// assert!(!set.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();

        if !tables::current(&self.tables, guard).1.is_empty() {
            return false;
        }

        let (_locks, current) = self.lock_all(guard);

        //  Safety:
        //  -   Protected by `guard`.
        unsafe { current.deref() }.is_empty()
    }

    /// Returns an iterator over the elements.
    ///
    /// The iterator is weakly consistent: it never fails nor blocks, whatever
    /// the concurrent modifications. Each element yielded was present at some
    /// point during the iteration, and is yielded once; elements inserted or
    /// removed concurrently may or may not be yielded.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.extend([1, 2, 3].iter().copied());
    ///
    /// let guard = set.guard();
    /// assert_eq!(6, set.iter(&guard).sum::<i32>());
    /// ```
    pub fn iter<'g>(&'g self, guard: &'g Guard) -> Iter<'g, T> {
        Iter::new(&self.tables, guard)
    }

    //  Creates an instance.
    fn create(
        concurrency_level: NonZeroUsize,
        capacity: usize,
        grow_stripes: bool,
        comparer: C,
    )
        -> Self
    {
        let concurrency_level = concurrency_level.get();

        //  Each stripe guards at least one bucket.
        let capacity = cmp::max(cmp::min(capacity, MAX_BUCKETS), concurrency_level);

        let tables = Tables::new(capacity, stripes::fresh(concurrency_level));
        let budget = RelaxedUsize::new(tables.budget());

        Self { comparer, grow_stripes, budget, tables: Atomic::new(tables) }
    }

    //  Acquires all the stripes, in ascending order.
    //
    //  Returns the stripes guards, and the generation they guard.
    fn lock_all<'g>(&self, guard: &'g Guard) -> (StripeGuards, Shared<'g, Tables<T>>) {
        let mut locks = StripeGuards::default();

        let (_, first) = tables::current(&self.tables, guard);
        locks.acquire(&first.stripes, 0..1);

        //  With stripe 0 held, the generation can no longer be replaced, and
        //  stripe 0 is shared by all generations.
        let (shared, current) = tables::current(&self.tables, guard);
        debug_assert!(Arc::ptr_eq(&first.stripes[0], &current.stripes[0]));

        locks.acquire(&current.stripes, 1..current.stripes.len());

        (locks, shared)
    }
}

impl<T, C> HashSet<T, C>
where
    T: Send + Sync + 'static,
    C: Comparer<T>,
{
    /// Creates a new instance of the `HashSet`, containing the elements of
    /// `collection`.
    ///
    /// The number of stripes grows along with the table.
    ///
    /// #   Errors
    ///
    /// Returns an error if any element is rejected by the comparer.
    pub fn try_from_iter_with_comparer<I>(collection: I, comparer: C) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let result = Self::with_comparer(comparer);
        result.try_extend(collection)?;
        Ok(result)
    }

    /// Creates a new instance of the `HashSet`, with `concurrency_level`
    /// stripes, containing the elements of `collection`.
    ///
    /// The number of stripes is fixed for the lifetime of the instance.
    ///
    /// #   Errors
    ///
    /// Returns an error if `concurrency_level` is 0, or if any element is
    /// rejected by the comparer.
    pub fn try_from_iter_with_concurrency_level<I>(
        concurrency_level: usize,
        collection: I,
        comparer: C,
    )
        -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let result = Self::try_with_concurrency_level_and_comparer(
            concurrency_level,
            DEFAULT_CAPACITY,
            comparer,
        )?;

        result.try_extend(collection)?;
        Ok(result)
    }

    /// Returns `true` if the set contains the value.
    ///
    /// Never blocks.
    ///
    /// #   Panics
    ///
    /// Panics if `value` is rejected by the comparer.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.insert(1);
    ///
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&0));
    /// ```
    pub fn contains(&self, value: &T) -> bool {
        self.try_contains(value).unwrap_or_else(|failure| panic_from_failure(failure))
    }

    /// Returns `true` if the set contains the value.
    ///
    /// Never blocks.
    ///
    /// #   Errors
    ///
    /// Returns an error if `value` is rejected by the comparer.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.insert(1);
    ///
    /// assert_eq!(Ok(true), set.try_contains(&1));
    /// assert_eq!(Ok(false), set.try_contains(&0));
    /// ```
    pub fn try_contains(&self, value: &T) -> Result<bool> {
        let guard = &epoch::pin();
        self.try_get(value, guard).map(|element| element.is_some())
    }

    /// Returns a reference to the element equal to `value`, if any.
    ///
    /// Never blocks.
    ///
    /// #   Errors
    ///
    /// Returns an error if `value` is rejected by the comparer.
    pub fn try_get<'g>(&'g self, value: &T, guard: &'g Guard) -> Result<Option<&'g T>> {
        let hash = self.try_hash(value)?;

        let (_, current) = tables::current(&self.tables, guard);
        let (bucket, _) = current.locate(hash);

        let node = current.find(bucket, hash, |item| self.comparer.eq(item, value), guard);

        Ok(node.map(|node| &*node.item))
    }

    /// Returns a reference to the element equal to `value`, if any.
    ///
    /// Calling this method is equivalent to calling `try_get` and panicking on
    /// error.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.insert(String::from("Palmer"));
    ///
    /// let guard = set.guard();
    /// assert_eq!(Some("Palmer"), set.get(&String::from("Palmer"), &guard).map(|s| s.as_str()));
    /// assert_eq!(None, set.get(&String::from("Carter"), &guard));
    /// ```
    pub fn get<'g>(&'g self, value: &T, guard: &'g Guard) -> Option<&'g T> {
        self.try_get(value, guard).unwrap_or_else(|failure| panic_from_failure(failure))
    }

    /// Inserts a value into the set.
    ///
    /// Returns `true` if the value was inserted, and `false` if an equal
    /// element was already present, in which case `value` is dropped.
    ///
    /// Only blocks writers of the same stripe, unless the table grows.
    ///
    /// #   Errors
    ///
    /// Returns an error if `value` is rejected by the comparer, or if the
    /// number of elements would overflow.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    ///
    /// assert_eq!(Ok(true), set.try_insert(3));
    /// assert_eq!(Ok(false), set.try_insert(3));
    /// ```
    pub fn try_insert(&self, value: T) -> Result<bool> {
        let hash = self.try_hash(&value)?;
        let item = Arc::new(value);

        let guard = &epoch::pin();

        loop {
            let (shared, current) = tables::current(&self.tables, guard);
            let (bucket, stripe) = current.locate(hash);

            let lock = stripes::lock(&current.stripes[stripe.0]);

            //  A concurrent growth may have moved the bucket to another stripe.
            if shared != self.tables.load(Ordering::Acquire, guard) {
                continue;
            }

            let slot = &current.buckets[bucket.0];

            //  Relaxed: the stripe is held.
            let head = slot.load(Ordering::Relaxed, guard);

            //  Safety:
            //  -   Protected by `guard`.
            let mut chain = unsafe { node::chain(head, guard) };

            if chain.any(|node| node.hash == hash && self.comparer.eq(&*node.item, &*item)) {
                return Ok(false);
            }

            let count = current.try_increment(stripe)?;

            //  Release: lock-free readers observe a fully constructed node.
            slot.store(Node::new(item, hash, head), Ordering::Release);

            let grow = count > self.budget.load();

            //  Growing acquires all stripes, from stripe 0.
            drop(lock);

            if grow {
                self.grow(shared, guard);
            }

            return Ok(true);
        }
    }

    /// Inserts a value into the set.
    ///
    /// Calling this method is equivalent to calling `try_insert` and panicking
    /// on error.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    ///
    /// assert!(set.insert(3));
    /// assert!(!set.insert(3));
    /// assert!(set.contains(&3));
    /// ```
    pub fn insert(&self, value: T) -> bool {
        self.try_insert(value).unwrap_or_else(|failure| panic_from_failure(failure))
    }

    /// Inserts multiple values in the set.
    ///
    /// If a value cannot be inserted because it is already present, it is
    /// dropped.
    ///
    /// #   Errors
    ///
    /// Returns an error on the first value which cannot be inserted; the
    /// values preceding it remain inserted.
    pub fn try_extend<I>(&self, collection: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        for value in collection {
            self.try_insert(value)?;
        }

        Ok(())
    }

    /// Inserts multiple values in the set.
    ///
    /// Calling this method is equivalent to calling `try_extend` and panicking
    /// on error.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.extend([1, 2, 3, 3].iter().copied());
    /// assert_eq!(3, set.len());
    /// ```
    pub fn extend<I>(&self, collection: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.try_extend(collection).unwrap_or_else(|failure| panic_from_failure(failure));
    }

    /// Removes the element equal to `value` from the set.
    ///
    /// Returns `true` if an element was removed, and `false` if none was
    /// present.
    ///
    /// Only blocks writers of the same stripe.
    ///
    /// #   Errors
    ///
    /// Returns an error if `value` is rejected by the comparer.
    pub fn try_remove(&self, value: &T) -> Result<bool> {
        let hash = self.try_hash(value)?;

        let guard = &epoch::pin();

        loop {
            let (shared, current) = tables::current(&self.tables, guard);
            let (bucket, stripe) = current.locate(hash);

            let _lock = stripes::lock(&current.stripes[stripe.0]);

            //  A concurrent growth may have moved the bucket to another stripe.
            if shared != self.tables.load(Ordering::Acquire, guard) {
                continue;
            }

            let mut link = &current.buckets[bucket.0];

            loop {
                //  Relaxed: the stripe is held.
                let candidate = link.load(Ordering::Relaxed, guard);

                //  Safety:
                //  -   Protected by `guard`.
                let Some(node) = (unsafe { candidate.as_ref() }) else {
                    return Ok(false);
                };

                if node.hash == hash && self.comparer.eq(&*node.item, value) {
                    let next = node.next.load(Ordering::Relaxed, guard);

                    //  The node keeps pointing to `next`, so that lock-free
                    //  readers currently on it may carry on.
                    link.store(next, Ordering::Release);
                    current.decrement(stripe);

                    //  Safety:
                    //  -   Unreachable from the table, hence only observable
                    //      by threads already pinned.
                    unsafe { guard.defer_destroy(candidate) };

                    return Ok(true);
                }

                link = &node.next;
            }
        }
    }

    /// Removes the element equal to `value` from the set.
    ///
    /// Calling this method is equivalent to calling `try_remove` and panicking
    /// on error.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.insert(3);
    ///
    /// assert!(set.remove(&3));
    /// assert!(!set.remove(&3));
    /// ```
    pub fn remove(&self, value: &T) -> bool {
        self.try_remove(value).unwrap_or_else(|failure| panic_from_failure(failure))
    }

    /// Clears the instance.
    ///
    /// The instance is then empty, and its table shrunk back to its default
    /// capacity; the stripes are retained.
    ///
    /// Acquires all stripes, blocking all writers for the duration.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::with_concurrency_level(2, 31);
    /// set.extend(0..100);
    /// assert!(set.number_buckets() > 31);
    ///
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert_eq!(31, set.number_buckets());
    /// ```
    pub fn clear(&self) {
        let guard = &epoch::pin();
        let (_locks, shared) = self.lock_all(guard);

        //  Safety:
        //  -   Protected by `guard`.
        let current = unsafe { shared.deref() };

        if current.is_empty() {
            return;
        }

        //  Each stripe guards at least one bucket.
        let number_buckets = cmp::max(DEFAULT_CAPACITY, current.stripes.len());

        let fresh = Tables::new(number_buckets, current.stripes.clone());

        self.budget.store(fresh.budget());
        self.tables.store(Owned::new(fresh), Ordering::Release);

        //  Safety:
        //  -   Unreachable from `self.tables`, hence only observable by
        //      threads already pinned.
        unsafe { guard.defer_destroy(shared) };

        trace!(buckets = number_buckets, stripes = current.stripes.len(), "cleared");
    }

    /// Copies the elements into `destination`, from `offset` onwards.
    ///
    /// Returns the number of elements copied.
    ///
    /// Acquires all stripes, blocking all writers for the duration.
    ///
    /// #   Errors
    ///
    /// Returns an error if `destination` cannot hold all elements from
    /// `offset` onwards, in which case `destination` is left untouched.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use striped::failure::Failure;
    /// #   use striped::hashset::HashSet;
    /// let set: HashSet<_> = HashSet::new();
    /// set.extend([1, 2, 3].iter().copied());
    ///
    /// let mut destination = [0; 4];
    /// assert_eq!(Ok(3), set.try_copy_to(&mut destination, 1));
    ///
    /// destination.sort();
    /// assert_eq!([0, 1, 2, 3], destination);
    ///
    /// assert_eq!(Err(Failure::DestinationTooSmall), set.try_copy_to(&mut destination, 2));
    /// ```
    pub fn try_copy_to(&self, destination: &mut [T], offset: usize) -> Result<usize>
    where
        T: Clone,
    {
        let guard = &epoch::pin();
        let (_locks, shared) = self.lock_all(guard);

        //  Safety:
        //  -   Protected by `guard`.
        let current = unsafe { shared.deref() };

        let size = current.try_size()?;

        let end = offset.checked_add(size.0).ok_or(Failure::DestinationTooSmall)?;
        let destination = destination.get_mut(offset..end).ok_or(Failure::DestinationTooSmall)?;

        let items = current.buckets.iter().flat_map(|bucket| {
            //  Relaxed: all stripes are held.
            let head = bucket.load(Ordering::Relaxed, guard);

            //  Safety:
            //  -   Protected by `guard`.
            unsafe { node::chain(head, guard) }
        });

        for (slot, node) in destination.iter_mut().zip(items) {
            slot.clone_from(&*node.item);
        }

        Ok(size.0)
    }

    /// Copies the elements into `destination`, from `offset` onwards.
    ///
    /// Calling this method is equivalent to calling `try_copy_to` and
    /// panicking on error.
    pub fn copy_to(&self, destination: &mut [T], offset: usize) -> usize
    where
        T: Clone,
    {
        self.try_copy_to(destination, offset).unwrap_or_else(|failure| panic_from_failure(failure))
    }

    //  Hashes `value`, after checking its validity.
    fn try_hash(&self, value: &T) -> Result<u64> {
        if self.comparer.is_valid(value) {
            Ok(self.comparer.hash(value))
        } else {
            Err(Failure::InvalidItem)
        }
    }

    //  Grows the table, if `shared` is still the current generation.
    //
    //  If the table is sparsely populated, the budget is doubled instead: many
    //  elements in few buckets are a symptom of poor hashing, which a larger
    //  table would not solve.
    //
    //  Must be called without holding any stripe.
    fn grow<'g>(&self, shared: Shared<'g, Tables<T>>, guard: &'g Guard) {
        //  Safety:
        //  -   Protected by `guard`.
        let current = unsafe { shared.deref() };

        //  Stripe 0 is shared by all generations: the first to acquire it grows.
        let mut locks = StripeGuards::default();
        locks.acquire(&current.stripes, 0..1);

        if shared != self.tables.load(Ordering::Acquire, guard) {
            return;
        }

        let size = current.approximate_size();

        if size < current.buckets.len() / 4 {
            let budget = self.budget.load().saturating_mul(2);
            self.budget.store(budget);

            debug!(size = size, buckets = current.buckets.len(), budget = budget, "sparse table, doubling budget");
            return;
        }

        let (number_buckets, maximized) = match capacity::next_number_buckets(current.buckets.len()) {
            Some(number_buckets) => (number_buckets, false),
            None => (MAX_BUCKETS, true),
        };

        locks.acquire(&current.stripes, 1..current.stripes.len());
        debug_assert_eq!(current.stripes.len(), locks.len());

        let number_stripes = if self.grow_stripes && current.stripes.len() < MAX_STRIPES {
            cmp::min(current.stripes.len() * 2, MAX_STRIPES)
        } else {
            current.stripes.len()
        };

        let fresh = current
            .try_rehash(number_buckets, stripes::extend(&current.stripes, number_stripes), guard)
            .unwrap_or_else(|failure| panic_from_failure(failure));

        //  At maximum size, the table can no longer grow: never try again.
        let budget = if maximized { usize::MAX } else { fresh.budget() };

        if maximized {
            warn!(buckets = number_buckets, "table reached its maximum number of buckets");
        }

        debug!(
            size = size,
            buckets = number_buckets,
            stripes = number_stripes,
            budget = budget,
            "grown from {} buckets and {} stripes",
            current.buckets.len(),
            current.stripes.len(),
        );

        self.budget.store(budget);
        self.tables.store(Owned::new(fresh), Ordering::Release);

        //  Safety:
        //  -   Unreachable from `self.tables`, hence only observable by
        //      threads already pinned.
        unsafe { guard.defer_destroy(shared) };
    }
}

impl<T, C> Drop for HashSet<T, C> {
    fn drop(&mut self) {
        //  Safety:
        //  -   Exclusive access, per &mut self.
        let guard = unsafe { epoch::unprotected() };

        let tables = self.tables.swap(Shared::null(), Ordering::Relaxed, guard);

        if !tables.is_null() {
            //  Safety:
            //  -   Exclusive access, and no longer reachable.
            drop(unsafe { tables.into_owned() });
        }
    }
}

impl<T, C: Default> Default for HashSet<T, C> {
    fn default() -> Self { Self::new() }
}

impl<T, C> fmt::Debug for HashSet<T, C>
where
    T: fmt::Debug + Send + Sync + 'static,
    C: Comparer<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let guard = &epoch::pin();

        write!(f, "HashSet {{ len: {}, items: ", self.len())?;
        f.debug_set().entries(self.iter(guard)).finish()?;
        write!(f, " }}")
    }
}

impl<T, C> iter::FromIterator<T> for HashSet<T, C>
where
    T: Send + Sync + 'static,
    C: Comparer<T> + Default,
{
    fn from_iter<I>(collection: I) -> Self
    where
        I: IntoIterator<Item = T>
    {
        Self::try_from_iter_with_comparer(collection, C::default())
            .unwrap_or_else(|failure| panic_from_failure(failure))
    }
}

//  Returns the default concurrency level: the available parallelism, capped
//  to the maximum number of stripes.
fn default_concurrency_level() -> NonZeroUsize {
    let parallelism = thread::available_parallelism().map_or(1, NonZeroUsize::get);

    NonZeroUsize::new(cmp::min(parallelism, MAX_STRIPES)).unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {

use std::collections::HashSet as StdHashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::utils::tester::*;

use super::*;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn hashset_send_sync() {
    assert_send_sync::<HashSet<i32>>();
    assert_send_sync::<HashSet<String, AsciiCaseComparer>>();
}

#[test]
fn hashset_palmer() {
    let set: HashSet<_> = HashSet::new();

    assert!(set.insert(String::from("Palmer")));
    assert!(!set.insert(String::from("Palmer")));
    assert_eq!(1, set.len());

    assert!(set.contains(&String::from("Palmer")));
    assert!(!set.contains(&String::from("Carter")));

    assert!(set.remove(&String::from("Palmer")));
    assert!(!set.remove(&String::from("Palmer")));
    assert!(set.is_empty());
}

#[test]
fn hashset_zero_concurrency_level() {
    let set: Result<HashSet<i32>> = HashSet::try_with_concurrency_level(0, 31);
    assert_eq!(Some(Failure::ZeroConcurrencyLevel), set.err());

    let set: Result<HashSet<i32>> =
        HashSet::try_from_iter_with_concurrency_level(0, 0..3, DefaultComparer::default());
    assert_eq!(Some(Failure::ZeroConcurrencyLevel), set.err());
}

#[test]
#[should_panic(expected = "ZeroConcurrencyLevel")]
fn hashset_zero_concurrency_level_panics() {
    let _: HashSet<i32> = HashSet::with_concurrency_level(0, 31);
}

#[test]
fn hashset_capacity_raised_to_concurrency_level() {
    let set: HashSet<i32> = HashSet::with_concurrency_level(16, 0);

    assert_eq!(16, set.number_stripes());
    assert_eq!(16, set.number_buckets());
}

#[test]
fn hashset_default_concurrency_level() {
    let set: HashSet<i32> = HashSet::new();

    assert_eq!(default_concurrency_level().get(), set.number_stripes());
    assert!(set.number_stripes() <= MAX_STRIPES);
    assert_eq!(cmp::max(DEFAULT_CAPACITY, set.number_stripes()), set.number_buckets());
}

#[test]
fn hashset_thousand() {
    let set: HashSet<_> = HashSet::with_concurrency_level(4, 31);

    for i in 0..1000 {
        assert!(set.insert(i));
    }

    assert_eq!(1000, set.len());
    assert_eq!(4, set.number_stripes());
    assert!(set.number_buckets() > 31);

    assert!((0..1000).all(|i| set.contains(&i)));
    assert!((1000..2000).all(|i| !set.contains(&i)));
}

#[test]
fn hashset_grow_preserves_membership() {
    let set: HashSet<_> = HashSet::with_concurrency_level(2, 3);

    let mut buckets = set.number_buckets();

    for i in 0..5000u32 {
        set.insert(i);

        let current = set.number_buckets();
        assert!(current >= buckets);
        buckets = current;
    }

    for i in (0..5000).step_by(2) {
        assert!(set.remove(&i));
    }

    assert_eq!(2500, set.len());
    assert!((0..5000).all(|i| set.contains(&i) == (i % 2 == 1)));
}

#[test]
fn hashset_stripes_ceiling() {
    let set: HashSet<u32> = HashSet::new();
    assert!(set.number_stripes() <= MAX_STRIPES);

    set.extend(0..200_000);

    assert_eq!(200_000, set.len());
    assert_eq!(MAX_STRIPES, set.number_stripes());
    assert!(set.number_stripes() <= set.number_buckets());
}

#[test]
fn hashset_budget_doubling() {
    //  All elements land in bucket 0, hence stripe 0.
    let set: HashSet<u32, ConstantComparer> = HashSet::with_concurrency_level(31, 31);
    assert_eq!(1, set.budget.load());

    set.insert(0);
    assert_eq!(1, set.budget.load());

    set.insert(1);
    assert_eq!(2, set.budget.load());

    set.insert(2);
    assert_eq!(4, set.budget.load());

    set.extend(3..8);
    assert_eq!(8, set.budget.load());
    assert_eq!(31, set.number_buckets());

    //  9 elements no longer qualify as sparse.
    set.insert(8);
    assert_eq!(67, set.number_buckets());
    assert_eq!(31, set.number_stripes());
    assert_eq!(2, set.budget.load());

    assert_eq!(9, set.len());
    assert!((0..9).all(|i| set.contains(&i)));
}

#[test]
fn hashset_custom_comparer() {
    let set: HashSet<String, AsciiCaseComparer> = HashSet::new();

    assert!(set.insert(String::from("Palmer")));
    assert!(!set.insert(String::from("PALMER")));
    assert!(set.contains(&String::from("palmer")));

    let guard = set.guard();
    let palmer = set.get(&String::from("pAlMeR"), &guard);
    assert_eq!(Some("Palmer"), palmer.map(|s| s.as_str()));

    assert!(set.remove(&String::from("palmer")));
    assert!(set.is_empty());
}

#[test]
fn hashset_invalid_item() {
    let set: HashSet<String, AsciiCaseComparer> = HashSet::new();
    let guard = set.guard();

    assert_eq!(Err(Failure::InvalidItem), set.try_insert(String::new()));
    assert_eq!(Err(Failure::InvalidItem), set.try_remove(&String::new()));
    assert_eq!(Err(Failure::InvalidItem), set.try_get(&String::new(), &guard));
    assert_eq!(Err(Failure::InvalidItem), set.try_contains(&String::new()));

    //  Elements preceding the invalid one remain inserted.
    let extended = set.try_extend(vec![String::from("a"), String::new(), String::from("b")]);
    assert_eq!(Err(Failure::InvalidItem), extended);
    assert_eq!(1, set.len());

    let seeded = HashSet::try_from_iter_with_comparer(
        vec![String::from("a"), String::new()],
        AsciiCaseComparer,
    );
    assert_eq!(Some(Failure::InvalidItem), seeded.err());
}

#[test]
#[should_panic(expected = "InvalidItem")]
fn hashset_invalid_item_insert_panics() {
    let set: HashSet<String, AsciiCaseComparer> = HashSet::new();
    set.insert(String::new());
}

#[test]
#[should_panic(expected = "InvalidItem")]
fn hashset_invalid_item_contains_panics() {
    let set: HashSet<String, AsciiCaseComparer> = HashSet::new();
    set.contains(&String::new());
}

#[test]
fn hashset_clear() {
    let set: HashSet<u32> = HashSet::new();

    //  Clearing an empty instance is a no-op.
    set.clear();
    assert!(set.is_empty());

    set.extend(0..5000);
    let stripes = set.number_stripes();
    assert!(set.number_buckets() > DEFAULT_CAPACITY);

    set.clear();

    assert!(set.is_empty());
    assert_eq!(0, set.len());
    assert!((0..5000).all(|i| !set.contains(&i)));

    assert_eq!(stripes, set.number_stripes());
    assert_eq!(cmp::max(DEFAULT_CAPACITY, stripes), set.number_buckets());

    //  The instance remains usable.
    assert!(set.insert(3));
    assert_eq!(1, set.len());
}

#[test]
fn hashset_copy_to() {
    let set: HashSet<_> = (1..=5).collect();

    let mut destination = [0; 5];
    assert_eq!(Ok(5), set.try_copy_to(&mut destination, 0));

    destination.sort();
    assert_eq!([1, 2, 3, 4, 5], destination);

    let mut destination = [0; 8];
    assert_eq!(5, set.copy_to(&mut destination, 2));

    assert_eq!(&[0, 0], &destination[..2]);
    assert_eq!(&[0], &destination[7..]);
    assert_eq!(15, destination.iter().sum::<i32>());
}

#[test]
fn hashset_copy_to_too_small() {
    let set: HashSet<_> = (1..=5).collect();

    let mut destination = [0; 5];
    assert_eq!(Err(Failure::DestinationTooSmall), set.try_copy_to(&mut destination, 1));
    assert_eq!(Err(Failure::DestinationTooSmall), set.try_copy_to(&mut destination, 6));
    assert_eq!(Err(Failure::DestinationTooSmall), set.try_copy_to(&mut destination, usize::MAX));

    //  Left untouched.
    assert_eq!([0; 5], destination);

    let empty: HashSet<i32> = HashSet::new();
    assert_eq!(Ok(0), empty.try_copy_to(&mut destination, 5));
}

#[test]
#[should_panic(expected = "DestinationTooSmall")]
fn hashset_copy_to_panics() {
    let set: HashSet<_> = (1..=5).collect();

    let mut destination = [0; 4];
    set.copy_to(&mut destination, 0);
}

#[test]
fn hashset_debug() {
    let set: HashSet<i32> = HashSet::new();
    assert_eq!("HashSet { len: 0, items: {} }", format!("{:?}", set));

    set.insert(7);
    assert_eq!("HashSet { len: 1, items: {7} }", format!("{:?}", set));
}

#[test]
fn hashset_from_iter() {
    let set: HashSet<_> = [1, 2, 2, 3, 3, 3].iter().copied().collect();

    assert_eq!(3, set.len());
    assert!((1..=3).all(|i| set.contains(&i)));

    let set: HashSet<i32> =
        HashSet::try_from_iter_with_concurrency_level(3, 0..100, DefaultComparer::default())
            .unwrap();

    assert_eq!(3, set.number_stripes());
    assert_eq!(100, set.len());
}

#[test]
fn hashset_drop_elements() {
    static COUNT: SpyCount = SpyCount::zero();

    {
        let set: HashSet<_> = HashSet::with_concurrency_level(1, 64);

        for i in 0..10 {
            assert!(set.insert(SpyElement::new(i, &COUNT)));
        }

        assert_eq!(10, COUNT.get());

        //  A rejected duplicate is dropped immediately.
        assert!(!set.insert(SpyElement::new(3, &COUNT)));
        assert_eq!(10, COUNT.get());
    }

    assert_eq!(0, COUNT.get());
}

#[test]
fn hashset_drop_elements_reclaimed() {
    static COUNT: SpyCount = SpyCount::zero();

    {
        let set: HashSet<_> = HashSet::with_concurrency_level(2, 3);

        //  Grows, sharing elements between generations.
        for i in 0..2000 {
            assert!(set.insert(SpyElement::new(i, &COUNT)));
        }

        assert!(set.number_buckets() > 3);
        assert_eq!(2000, COUNT.get());

        for i in (0..2000).step_by(2) {
            assert!(set.remove(&SpyElement::new(i, &COUNT)));
        }

        assert_eq!(1000, set.len());

        set.clear();
        assert!(set.is_empty());

        for i in 0..500 {
            assert!(set.insert(SpyElement::new(i, &COUNT)));
        }

        assert_eq!(500, set.len());
    }

    //  Removed nodes and superseded generations are reclaimed lazily.
    for _ in 0..1000 {
        if COUNT.get() == 0 {
            break;
        }

        epoch::pin().flush();
    }

    assert_eq!(0, COUNT.get());
}

#[test]
fn hashset_concurrent_conservation() {
    const THREADS: u32 = 4;
    const PER_THREAD: u32 = 2000;
    const SHARED: u32 = 500;

    let set: HashSet<u32> = HashSet::with_concurrency_level(4, 31);
    let shared_inserted = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..THREADS {
            let (set, shared_inserted) = (&set, &shared_inserted);

            scope.spawn(move |_| {
                let base = t * PER_THREAD;

                for i in base..(base + PER_THREAD) {
                    assert!(set.insert(i));
                }

                //  All threads race on the same elements.
                for i in 0..SHARED {
                    if set.insert(THREADS * PER_THREAD + i) {
                        shared_inserted.fetch_add(1, Ordering::Relaxed);
                    }
                }

                for i in (base..(base + PER_THREAD)).step_by(2) {
                    assert!(set.remove(&i));
                }
            });
        }
    }).unwrap();

    assert_eq!(SHARED as usize, shared_inserted.load(Ordering::Relaxed));

    let mut reference = StdHashSet::new();

    for i in 0..(THREADS * PER_THREAD) {
        if i % 2 == 1 {
            reference.insert(i);
        }
    }

    reference.extend((0..SHARED).map(|i| THREADS * PER_THREAD + i));

    assert_eq!(reference.len(), set.len());
    assert!(reference.iter().all(|i| set.contains(i)));

    let guard = set.guard();
    let elements: StdHashSet<_> = set.iter(&guard).copied().collect();
    assert_eq!(reference, elements);
}

#[test]
fn hashset_concurrent_iteration() {
    let set: HashSet<u32> = HashSet::with_concurrency_level(4, 1024);
    set.extend(0..200);

    let done = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|scope| {
        let (set, done) = (&set, &done);

        //  Churns the first half, the second half remains untouched.
        scope.spawn(move |_| {
            for _ in 0..100 {
                for i in 0..100 {
                    assert!(set.remove(&i));
                }
                for i in 0..100 {
                    assert!(set.insert(i));
                }
            }

            done.store(1, Ordering::Release);
        });

        scope.spawn(move |_| {
            while done.load(Ordering::Acquire) == 0 {
                let guard = set.guard();

                let mut seen = StdHashSet::new();

                for element in set.iter(&guard) {
                    assert!(seen.insert(*element), "{} yielded twice", element);
                }

                assert!((100..200).all(|i| seen.contains(&i)));
            }
        });
    }).unwrap();

    assert_eq!(200, set.len());
}

#[test]
fn hashset_concurrent_growth() {
    let set: HashSet<u32> = HashSet::new();

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..4u32 {
            let set = &set;

            scope.spawn(move |_| {
                for i in 0..10_000 {
                    set.insert(i * 4 + t);
                }
            });
        }

        //  Lock-free readers carry on while the table grows.
        scope.spawn(|_| {
            for _ in 0..100 {
                let guard = set.guard();
                assert!(set.iter(&guard).count() <= 40_000);
            }
        });
    }).unwrap();

    assert_eq!(40_000, set.len());
    assert!((0..40_000).all(|i| set.contains(&i)));
    assert!(set.number_stripes() <= set.number_buckets());
}

}   //  mod tests
