//! Split handling module
//!
//! Decides what replaces an enumerator whose range split or whose archive
//! drained.
//!
//! # Overview
//!
//! - `EnumeratorQueue` - round-robin work queue; the failed enumerator sits at the front
//! - `DefaultSplitStrategy` - replaces a range with the current ranges covering it
//! - `FullFidelityChangeFeedSplitStrategy` - replays archived history before live children

mod queue;
mod strategies;
mod types;

pub use queue::EnumeratorQueue;
pub use strategies::{
    resolve_child_ranges, DefaultSplitStrategy, FullFidelityChangeFeedSplitStrategy,
};
pub use types::{SplitOutcome, SplitStrategy};
