//! Per-range enumerator module
//!
//! Each enumerator owns one `FeedRangeState` and advances it one page at a
//! time. A live enumerator reports a gone range as a split. An archival
//! enumerator also reports a split once its history is drained, so the
//! driver replaces it with the ranges that took over.

mod partition;
mod types;

pub use partition::{ArchivalRangeEnumerator, LiveRangeEnumerator, RangeEnumerator};
pub use types::{EnumeratorStatus, MoveNextOutcome, PartitionRangePageAsyncEnumerator};
