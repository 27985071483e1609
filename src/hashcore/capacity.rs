//! The HashSet capacity.
//!
//! Computations related to the layout of a table generation: which bucket and
//! stripe a hash maps to, and how large the next generation is.

use std::cmp;

//  The capacity of a table when none is specified, or when cleared.
pub const DEFAULT_CAPACITY: usize = 31;

//  The maximum number of stripes that the stripe array may grow to.
pub const MAX_STRIPES: usize = 1024;

//  The maximum number of buckets of a table.
pub const MAX_BUCKETS: usize = 0x7FEF_FFFF;

/// The index of a bucket.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BucketIndex(pub usize);

/// The index of a stripe.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StripeIndex(pub usize);

/// The number of elements in all buckets.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size(pub usize);

//  Returns the bucket of `hash`.
//
//  `number_buckets` is assumed to be non-zero.
pub fn bucket_of(hash: u64, number_buckets: usize) -> BucketIndex {
    debug_assert!(number_buckets > 0);

    //  The remainder is strictly less than `number_buckets`, hence fits.
    BucketIndex((hash % number_buckets as u64) as usize)
}

//  Returns the bucket and stripe of `hash`.
//
//  The stripe of a bucket is its index modulo the number of stripes, hence a
//  bucket is always guarded by the same stripe within a generation.
pub fn locate(hash: u64, number_buckets: usize, number_stripes: usize)
    -> (BucketIndex, StripeIndex)
{
    debug_assert!(number_stripes > 0);

    let bucket = bucket_of(hash, number_buckets);
    (bucket, StripeIndex(bucket.0 % number_stripes))
}

//  Returns the budget of a generation, ie the number of elements a stripe may
//  guard before growing is considered.
pub fn budget(number_buckets: usize, number_stripes: usize) -> usize {
    cmp::max(1, number_buckets / number_stripes)
}

//  Returns the number of buckets of the generation following one with
//  `number_buckets` buckets.
//
//  The result is the smallest integer no less than `2 * number_buckets + 1`
//  which is divisible by neither 2, 3, 5, nor 7.
//
//  Returns `None` if the result would exceed `MAX_BUCKETS`, or overflow.
pub fn next_number_buckets(number_buckets: usize) -> Option<usize> {
    let mut result = number_buckets.checked_mul(2)?.checked_add(1)?;

    while result % 3 == 0 || result % 5 == 0 || result % 7 == 0 {
        result = result.checked_add(2)?;
    }

    debug_assert!(result % 2 != 0);

    if result > MAX_BUCKETS { None } else { Some(result) }
}

//  mod tests
