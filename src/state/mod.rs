//! State module
//!
//! Cursor tracking, checkpointing, and resumability.
//!
//! # Overview
//!
//! The state module provides:
//! - `ChangeFeedState` - Resume point within one range
//! - `FeedRangeState` - A range bound to its resume point
//! - `ChangeFeedCrossFeedRangeState` - Cursor over a whole scope, with merge and split
//! - `CheckpointStore` - File-based cursor persistence

mod checkpoint;
mod types;

pub use checkpoint::CheckpointStore;
pub use types::{ChangeFeedCrossFeedRangeState, ChangeFeedState, FeedRangeState};

#[cfg(test)]
mod checkpoint_tests;
