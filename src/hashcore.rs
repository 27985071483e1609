//! Internal definition of the HashSet buckets, and their generations.

pub mod capacity;
pub mod node;
pub mod tables;

use super::failure;
use super::utils::atomic;
use super::utils::stripes;
