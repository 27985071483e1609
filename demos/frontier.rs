//! A crawler frontier example.
//!
//! In this example, a handful of Crawler threads explore a synthetic web, in which each page links to a few others.
//!
//! The set of visited pages is shared by all Crawlers: whichever Crawler inserts a page first crawls it, the others
//! skip it. Each page is thus crawled exactly once, without any Crawler coordinating with another.

extern crate crossbeam_utils;
extern crate striped;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use striped::hashset::HashSet;

const NUMBER_CRAWLERS: usize = 4;
const NUMBER_PAGES: usize = 10_000;
const NUMBER_LINKS: usize = 3;

//  The pages linked from `page`.
fn links(page: usize) -> impl Iterator<Item = usize> {
    (1..=NUMBER_LINKS).map(move |i| (page * 7 + i * 31) % NUMBER_PAGES)
}

fn main() {
    //  Pinned stripes: the number of Crawlers is known in advance.
    let visited: HashSet<usize> = HashSet::with_concurrency_level(NUMBER_CRAWLERS, NUMBER_PAGES);
    let frontier = Mutex::new(vec![0]);
    let crawled = AtomicUsize::new(0);

    visited.insert(0);

    crossbeam_utils::thread::scope(|scope| {
        for crawler in 0..NUMBER_CRAWLERS {
            let (visited, frontier, crawled) = (&visited, &frontier, &crawled);

            scope.spawn(move |_| {
                let mut local = 0;

                loop {
                    let page = frontier.lock().unwrap().pop();

                    let Some(page) = page else {
                        //  Others may still be crawling, and feed the frontier.
                        if crawled.load(Ordering::Acquire) == visited.len() {
                            break;
                        }

                        std::thread::yield_now();
                        continue;
                    };

                    //  Only the first to discover a page pushes it.
                    let discovered: Vec<_> = links(page).filter(|link| visited.insert(*link)).collect();

                    frontier.lock().unwrap().extend(discovered);

                    local += 1;
                    crawled.fetch_add(1, Ordering::AcqRel);
                }

                println!("Crawler {} - crawled {} pages", crawler, local);
            });
        }
    })
    .unwrap();

    println!(
        "Crawled {} pages, visited {} pages over {} buckets",
        crawled.load(Ordering::Acquire),
        visited.len(),
        visited.number_buckets(),
    );

    assert_eq!(crawled.load(Ordering::Acquire), visited.len());
}
