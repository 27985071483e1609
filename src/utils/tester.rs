//! Internal testing utilities

use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::comparer::Comparer;

//  SpyCount
//
//  A counter of the number of instances of elements.
pub struct SpyCount(AtomicUsize);

impl SpyCount {
    pub const fn zero() -> Self { SpyCount(AtomicUsize::new(0)) }

    pub fn get(&self) -> usize { self.0.load(Ordering::Relaxed) }

    fn decrement(&self) { self.0.fetch_sub(1, Ordering::Relaxed); }

    fn increment(&self) { self.0.fetch_add(1, Ordering::Relaxed); }
}

//  Spy Element
//
//  An element tracking the number of instances, helpful to ensure proper drop.
//
//  Only the key takes part in equality and hashing.
pub struct SpyElement<'a> {
    key: u32,
    count: &'a SpyCount,
}

impl<'a> SpyElement<'a> {
    pub fn new(key: u32, count: &'a SpyCount) -> Self {
        count.increment();
        SpyElement { key, count }
    }
}

impl<'a> Drop for SpyElement<'a> {
    fn drop(&mut self) {
        self.count.decrement();
    }
}

impl<'a> PartialEq for SpyElement<'a> {
    fn eq(&self, other: &Self) -> bool { self.key == other.key }
}

impl<'a> Eq for SpyElement<'a> {}

impl<'a> Hash for SpyElement<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) { self.key.hash(state) }
}

//  A comparer hashing all elements to the same value.
#[derive(Default)]
pub struct ConstantComparer;

impl<T: Eq> Comparer<T> for ConstantComparer {
    fn hash(&self, _value: &T) -> u64 { 0 }

    fn eq(&self, left: &T, right: &T) -> bool { left == right }
}

//  A comparer of strings, ignoring ASCII case, and rejecting empty strings.
#[derive(Default)]
pub struct AsciiCaseComparer;

impl Comparer<String> for AsciiCaseComparer {
    fn hash(&self, value: &String) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.to_ascii_lowercase().hash(&mut hasher);
        hasher.finish()
    }

    fn eq(&self, left: &String, right: &String) -> bool { left.eq_ignore_ascii_case(right) }

    fn is_valid(&self, value: &String) -> bool { !value.is_empty() }
}
