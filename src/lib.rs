// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Change Feed Engine
//!
//! Reads a partitioned change feed across every range of a scope, surviving
//! partition splits without losing or repeating changes.
//!
//! ## Features
//!
//! - **Cross-range reads**: Round-robin paging over all ranges with a single resumable cursor
//! - **Split handling**: Gone ranges are replaced by their successors transparently
//! - **Full fidelity**: Archived history of a split range is replayed before its successors
//! - **Portable continuations**: Plain JSON tokens, versioned envelopes, legacy migration
//! - **Checkpointing**: Persist the cursor to disk after every page
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use changefeed_engine::{
//!     ChangeFeedConfig, ChangeFeedCrossFeedRangeState, CrossPartitionChangeFeedAsyncEnumerator,
//!     FeedRange, InMemoryChangeFeed, Result,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let feed = Arc::new(InMemoryChangeFeed::with_partitions(4)?);
//!     let state = ChangeFeedCrossFeedRangeState::create_from_beginning(FeedRange::full_range());
//!
//!     let mut reader = CrossPartitionChangeFeedAsyncEnumerator::new(
//!         feed.clone(),
//!         feed,
//!         state,
//!         ChangeFeedConfig::default(),
//!     )?;
//!
//!     while let Some(page) = reader.next_page().await? {
//!         if page.is_not_modified() {
//!             break;
//!         }
//!         let token = page.continuation();
//!         // Process page.json_items()? and persist token
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │           CrossPartitionChangeFeedAsyncEnumerator               │
//! │  next_page() → CrossFeedRangePage    continuation() → token     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───────┬──────────────┬──────────┐
//! │  Enumerators │    Split Strategy     │   Archival   │  Tokens  │
//! ├──────────────┼───────────────────────┼──────────────┼──────────┤
//! │ Live range   │ Default (successors)  │ Split graph  │ Plain    │
//! │ Archival     │ Full fidelity         │ Lineage      │ V1 / V2  │
//! └──────────────┴───────────────────────┴──────────────┴──────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the engine
pub mod error;

/// Common types and type aliases
pub mod types;

/// Key ranges and physical partition ranges
pub mod range;

/// Archival partitions and split graphs
pub mod archival;

/// Cursor state and checkpointing
pub mod state;

/// Continuation token encoding
pub mod continuation;

/// Data source and range provider seams
pub mod source;

/// Per-range page enumerators
pub mod enumerator;

/// Split handling
pub mod split;

/// Cross-range driver
pub mod engine;

/// Read configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use archival::{ArchivalPartitionHelper, FeedRangeArchivalPartition, SplitGraph};
pub use config::ChangeFeedConfig;
pub use continuation::{parse_continuation, parse_versioned, serialize_continuation};
pub use engine::{ChangeFeedStats, CrossFeedRangePage, CrossPartitionChangeFeedAsyncEnumerator};
pub use range::{FeedRange, FeedRangeEpk, PartitionKeyRange};
pub use source::{ChangeFeedDataSource, FeedRangeProvider, InMemoryChangeFeed};
pub use split::{DefaultSplitStrategy, FullFidelityChangeFeedSplitStrategy, SplitStrategy};
pub use state::{ChangeFeedCrossFeedRangeState, ChangeFeedState, CheckpointStore, FeedRangeState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
