//! Data source module
//!
//! Collaborator traits the engine reads through, plus an in-memory
//! implementation.
//!
//! # Overview
//!
//! - `ChangeFeedDataSource` - fetches one page for one range
//! - `FeedRangeProvider` - reports the live range topology and archival lineage
//! - `InMemoryChangeFeed` - partitioned change log that can split while being read

mod memory;
mod types;

pub use memory::{effective_partition_key, ChangeRecord, InMemoryChangeFeed};
pub use types::{
    ChangeFeedDataSource, ChangeFeedNotModifiedPage, ChangeFeedPage, ChangeFeedPaginationOptions,
    ChangeFeedResponse, ChangeFeedSuccessPage, FeedRangeProvider, DEFAULT_PAGE_SIZE,
};

#[cfg(test)]
mod tests;
