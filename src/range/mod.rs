//! Range descriptors module
//!
//! Describes slices of the partition key space.
//!
//! # Overview
//!
//! A cursor is always bound to one of three kinds of range:
//! - `FeedRangeEpk` - a logical key-space slice with no physical identity
//! - `PartitionKeyRange` - a physical range with an id and its ancestor chain
//! - `FeedRangeArchivalPartition` - a synthetic range reading a split ancestor's history
//!
//! Keys are effective partition key strings compared ordinally, with `""` as
//! the minimum and `"FF"` as the exclusive maximum.

mod epk;
mod types;

pub use epk::midpoint;
pub use types::{compare_range_ids, FeedRange, FeedRangeEpk, PartitionKeyRange, MAX_EPK, MIN_EPK};

#[cfg(test)]
mod tests;
