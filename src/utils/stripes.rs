//! Lock stripes.
//!
//! A stripe is a lock guarding a fixed subset of the buckets. The stripes
//! outlive any single generation of the table: a generation reuses, and
//! possibly extends, the stripes of its predecessor.
//!
//! There is a single acquisition order for multiple stripes: ascending, from
//! stripe 0. `StripeGuards` only ever acquires in that order.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

//  A single stripe.
pub type Stripe = Arc<Mutex<()>>;

//  The guard of a single stripe, owned so as not to borrow the generation.
pub type StripeGuard = ArcMutexGuard<RawMutex, ()>;

//  Creates `number` fresh stripes.
pub fn fresh(number: usize) -> Box<[Stripe]> {
    (0..number).map(|_| Stripe::default()).collect()
}

//  Creates `number` stripes, reusing `existing` and completing with fresh ones.
//
//  Reusing the existing stripes is what keeps the writers of the previous
//  generation excluded: they hold, or wait for, the very same locks.
pub fn extend(existing: &[Stripe], number: usize) -> Box<[Stripe]> {
    debug_assert!(existing.len() <= number);

    existing.iter()
        .cloned()
        .chain((existing.len()..number).map(|_| Stripe::default()))
        .collect()
}

//  Locks a single stripe.
pub fn lock(stripe: &Stripe) -> StripeGuard { stripe.lock_arc() }

//  A set of acquired stripes, released on drop.
#[derive(Default)]
pub struct StripeGuards(Vec<StripeGuard>);

impl StripeGuards {
    //  Acquires the stripes in `range`, in ascending order.
    //
    //  The stripes prior to `range.start` are expected to be held already.
    pub fn acquire(&mut self, stripes: &[Stripe], range: Range<usize>) {
        debug_assert_eq!(self.0.len(), range.start);
        debug_assert!(range.end <= stripes.len());

        self.0.reserve(range.len());

        for stripe in &stripes[range] {
            self.0.push(lock(stripe));
        }
    }

    //  Returns the number of stripes held.
    pub fn len(&self) -> usize { self.0.len() }
}

//  mod tests
