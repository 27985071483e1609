//! A simple blacklist example.
//!
//! In this example, there are two threads:
//! -   A Producer thread will intermittently black-list new IDs, and lift the ban on older ones.
//! -   A Consumer thread will "model" a continuous stream of messages coming and for each check their sender against
//!     the black-list.
//!
//! There could be more Consumer threads; for clarity there isn't.

extern crate crossbeam_utils;
extern crate striped;

use std::{thread, time};
use std::sync::atomic::{AtomicBool, Ordering};

use striped::hashset::HashSet;

const NUMBER_ELEMENTS_PER_BATCH: usize = 10;
const NUMBER_BATCHES: usize = 10;

//  Number of batches a ban lasts.
const BAN_BATCHES: usize = 3;

const PACE_TIME: time::Duration = time::Duration::from_millis(100);

//  "Randomly" black-list a few IDs.
fn is_banned(id: usize) -> bool { id * 13 % NUMBER_ELEMENTS_PER_BATCH == 0 }

fn main() {
    let blacklist: HashSet<String> = HashSet::new();
    let finished = AtomicBool::new(false);

    crossbeam_utils::thread::scope(|scope| {
        //
        //  Consumer
        //
        scope.spawn(|_| {
            thread::sleep(PACE_TIME);

            let mut blacklisted = 0;

            while !finished.load(Ordering::Acquire) {
                //  Simulate continuous stream of messages
                for i in 0..NUMBER_BATCHES {
                    for j in 0..NUMBER_ELEMENTS_PER_BATCH {
                        let id = format!("{}", i * NUMBER_ELEMENTS_PER_BATCH + j);

                        if blacklist.contains(&id) {
                            println!("Consumer - {} is black-listed", id);
                            blacklisted += 1;
                        }
                    }
                }

                thread::sleep(PACE_TIME);
            }

            println!("Consumer - {} messages black-listed, ending with {:?}", blacklisted, blacklist);

            assert!(blacklisted >= BAN_BATCHES);
        });

        //
        //  Producer
        //
        for i in 0..NUMBER_BATCHES {
            for j in 0..NUMBER_ELEMENTS_PER_BATCH {
                let id = i * NUMBER_ELEMENTS_PER_BATCH + j;

                if is_banned(id) {
                    blacklist.insert(format!("{}", id));
                    println!("Producer - black-listing {}", id);
                }

                //  Lift the bans of older batches.
                if let Some(lifted) = id.checked_sub(BAN_BATCHES * NUMBER_ELEMENTS_PER_BATCH) {
                    if is_banned(lifted) && blacklist.remove(&format!("{}", lifted)) {
                        println!("Producer - lifting ban on {}", lifted);
                    }
                }
            }

            thread::sleep(PACE_TIME);
        }

        finished.store(true, Ordering::Release);
    })
    .unwrap();

    assert!(blacklist.len() <= BAN_BATCHES);
}
