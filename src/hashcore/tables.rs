//! A generation of the HashSet layout.
//!
//! A generation groups the buckets, the stripes guarding them, and the number
//! of elements guarded by each stripe. Once published, a generation is never
//! replaced in place: growing and clearing publish a new generation instead.

use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Shared};

use super::atomic::RelaxedUsize;
use super::capacity::{self, BucketIndex, Size, StripeIndex};
use super::failure::{Failure, Result};
use super::node::{self, Node};
use super::stripes::Stripe;

//  Returns the current generation.
//
//  The Acquire pairs with the Release publication of a generation, so that its
//  buckets, and the nodes they point to, are visible.
pub fn current<'g, T>(tables: &Atomic<Tables<T>>, guard: &'g Guard)
    -> (Shared<'g, Tables<T>>, &'g Tables<T>)
{
    let shared = tables.load(Ordering::Acquire, guard);

    //  Safety:
    //  -   A generation is only ever replaced, never nulled, while shared.
    //  -   A replaced generation is only reclaimed once `guard` is unpinned.
    (shared, unsafe { shared.deref() })
}

pub struct Tables<T> {
    //  The heads of the chains; never empty.
    pub buckets: Box<[Atomic<Node<T>>]>,
    //  The stripes; never more numerous than the buckets, and never empty.
    pub stripes: Box<[Stripe]>,
    //  The number of elements guarded by each stripe.
    //
    //  Only modified with the matching stripe held, and only consistent as a
    //  whole with all stripes held.
    pub counts: Box<[RelaxedUsize]>,
}

impl<T> Tables<T> {
    //  Creates an empty generation.
    pub fn new(number_buckets: usize, stripes: Box<[Stripe]>) -> Self {
        debug_assert!(!stripes.is_empty());
        debug_assert!(stripes.len() <= number_buckets);

        let buckets = (0..number_buckets).map(|_| Atomic::null()).collect();
        let counts = stripes.iter().map(|_| RelaxedUsize::default()).collect();

        Self { buckets, stripes, counts }
    }

    //  Returns the bucket and stripe of `hash`.
    pub fn locate(&self, hash: u64) -> (BucketIndex, StripeIndex) {
        capacity::locate(hash, self.buckets.len(), self.stripes.len())
    }

    //  Returns the budget matching this generation.
    pub fn budget(&self) -> usize {
        capacity::budget(self.buckets.len(), self.stripes.len())
    }

    //  Returns the head of the bucket.
    //
    //  The Acquire ensures that the fields of the head are visible, even
    //  without holding the bucket stripe.
    pub fn head<'g>(&self, bucket: BucketIndex, guard: &'g Guard) -> Shared<'g, Node<T>> {
        self.buckets[bucket.0].load(Ordering::Acquire, guard)
    }

    //  Finds the node matching `hash` and `eq` in `bucket`, lock-free.
    pub fn find<'g, F>(&self, bucket: BucketIndex, hash: u64, eq: F, guard: &'g Guard)
        -> Option<&'g Node<T>>
    where
        F: Fn(&T) -> bool,
    {
        let head = self.head(bucket, guard);

        //  Safety:
        //  -   The generation is protected by `guard`, and so are the nodes
        //      reachable from its buckets, including those unlinked since.
        let mut chain = unsafe { node::chain(head, guard) };

        chain.find(|node| node.hash == hash && eq(&*node.item))
    }

    //  Returns whether all stripes guard no element.
    //
    //  Only exact with all stripes held.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|count| count.load() == 0)
    }

    //  Returns the number of elements, saturating.
    //
    //  Only exact with all stripes held.
    pub fn approximate_size(&self) -> usize {
        self.counts.iter().fold(0usize, |acc, count| acc.saturating_add(count.load()))
    }

    //  Returns the number of elements.
    //
    //  Only exact with all stripes held.
    pub fn try_size(&self) -> Result<Size> {
        self.counts.iter()
            .try_fold(0usize, |acc, count| acc.checked_add(count.load()))
            .map(Size)
            .ok_or(Failure::ElementsOverflow)
    }

    //  Increments the number of elements guarded by `stripe`, returning it.
    //
    //  Assumes that `stripe` is held.
    pub fn try_increment(&self, stripe: StripeIndex) -> Result<usize> {
        let count = &self.counts[stripe.0];
        let result = count.load().checked_add(1).ok_or(Failure::ElementsOverflow)?;
        count.store(result);
        Ok(result)
    }

    //  Decrements the number of elements guarded by `stripe`.
    //
    //  Assumes that `stripe` is held, and guards at least one element.
    pub fn decrement(&self, stripe: StripeIndex) {
        let count = &self.counts[stripe.0];
        debug_assert!(count.load() > 0);
        count.store(count.load() - 1);
    }

    //  Creates a new generation with `number_buckets` buckets and `stripes`,
    //  containing a fresh node for each element of this generation.
    //
    //  Assumes that all stripes are held.
    pub fn try_rehash(&self, number_buckets: usize, stripes: Box<[Stripe]>, guard: &Guard)
        -> Result<Self>
    {
        let result = Self::new(number_buckets, stripes);

        for source in self.buckets.iter() {
            //  Relaxed: all stripes are held.
            let head = source.load(Ordering::Relaxed, guard);

            //  Safety:
            //  -   The generation is protected by `guard`.
            for node in unsafe { node::chain(head, guard) } {
                let (bucket, stripe) = result.locate(node.hash);
                let slot = &result.buckets[bucket.0];

                //  Relaxed: `result` is not shared until published.
                let next = slot.load(Ordering::Relaxed, guard);
                let fresh = Node::new(node.item.clone(), node.hash, next);
                slot.store(fresh, Ordering::Relaxed);

                result.try_increment(stripe)?;
            }
        }

        Ok(result)
    }
}

impl<T> Drop for Tables<T> {
    fn drop(&mut self) {
        //  Safety:
        //  -   A generation is only dropped once no reader may observe it, so
        //      neither may they observe its nodes.
        let guard = unsafe { epoch::unprotected() };

        for bucket in self.buckets.iter() {
            let mut current = bucket.load(Ordering::Relaxed, guard);

            while !current.is_null() {
                //  Safety:
                //  -   Exclusively owned, as per above. Unlinked nodes are
                //      unreachable from the buckets, and reclaimed separately.
                let node = unsafe { current.into_owned() };
                current = node.next.load(Ordering::Relaxed, guard);
            }
        }
    }
}

//  mod tests
