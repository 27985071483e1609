//! The Node, an element of a bucket chain.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

//  A link of the singly linked chain of a bucket.
//
//  Once created, only `next` is ever modified. The element is shared between
//  the nodes of successive generations, as a generation under construction
//  cannot move it out of the nodes lock-free readers may still traverse.
pub struct Node<T> {
    pub item: Arc<T>,
    pub hash: u64,
    pub next: Atomic<Node<T>>,
}

impl<T> Node<T> {
    //  Creates a new node, preceding `next`.
    pub fn new(item: Arc<T>, hash: u64, next: Shared<'_, Node<T>>) -> Owned<Self> {
        Owned::new(Self { item, hash, next: Atomic::from(next) })
    }

    //  Loads the next node, for lock-free readers.
    //
    //  The Acquire pairs with the Release store of writers, so that the fields
    //  of the next node are visible.
    pub fn next<'g>(&self, guard: &'g Guard) -> Shared<'g, Node<T>> {
        self.next.load(Ordering::Acquire, guard)
    }
}

//  Iterates over the chain starting at `head`.
//
//  #   Safety
//
//  -   Assumes that `head`, and all nodes reachable from it, are protected by
//      `guard` or otherwise not reclaimed for the duration of `'g`.
pub unsafe fn chain<'g, T>(head: Shared<'g, Node<T>>, guard: &'g Guard)
    -> impl Iterator<Item = &'g Node<T>> + 'g
where
    T: 'g,
{
    let mut current = head;

    std::iter::from_fn(move || {
        //  Safety:
        //  -   Protected by `guard`, as per pre-condition.
        let node = unsafe { current.as_ref() }?;
        current = node.next(guard);
        Some(node)
    })
}

//  mod tests
