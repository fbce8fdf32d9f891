//! Collaborator traits and page types
//!
//! The engine never talks to a store directly. It reads pages through
//! `ChangeFeedDataSource` and learns the range topology through
//! `FeedRangeProvider`.

use crate::archival::{ArchivalPartitionHelper, FeedRangeArchivalPartition};
use crate::error::Result;
use crate::range::{FeedRange, FeedRangeEpk, PartitionKeyRange};
use crate::state::{ChangeFeedState, FeedRangeState};
use crate::types::{ChangeFeedMode, ContentFormat, JsonValue};
use async_trait::async_trait;
use bytes::Bytes;

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

// ============================================================================
// Pagination Options
// ============================================================================

/// Per-request options handed to the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFeedPaginationOptions {
    /// Maximum items per page
    pub page_size: usize,
    /// Which changes to return
    pub mode: ChangeFeedMode,
    /// Encoding of page content
    pub format: ContentFormat,
}

impl Default for ChangeFeedPaginationOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            mode: ChangeFeedMode::default(),
            format: ContentFormat::default(),
        }
    }
}

impl ChangeFeedPaginationOptions {
    /// Options for the given mode with default page size and format
    pub fn new(mode: ChangeFeedMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the content format
    #[must_use]
    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.format = format;
        self
    }
}

// ============================================================================
// Pages
// ============================================================================

/// A page that carried changes
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFeedSuccessPage {
    /// Encoded items
    pub content: Bytes,
    /// Number of items in `content`
    pub item_count: usize,
    /// Cost reported by the data source
    pub request_charge: f64,
    /// Request correlation id
    pub activity_id: String,
    /// Cursor after this page
    pub state: ChangeFeedState,
}

impl ChangeFeedSuccessPage {
    /// Decode JSON content as an array of items
    pub fn json_items(&self) -> Result<Vec<JsonValue>> {
        Ok(serde_json::from_slice(&self.content)?)
    }
}

/// A page reporting that nothing changed since the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFeedNotModifiedPage {
    /// Cost reported by the data source
    pub request_charge: f64,
    /// Request correlation id
    pub activity_id: String,
    /// Cursor to resume from
    pub state: ChangeFeedState,
}

/// A page from one range
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeFeedPage {
    /// Changes were returned
    Success(ChangeFeedSuccessPage),
    /// Nothing changed
    NotModified(ChangeFeedNotModifiedPage),
}

impl ChangeFeedPage {
    /// Cursor after this page
    pub fn state(&self) -> &ChangeFeedState {
        match self {
            Self::Success(page) => &page.state,
            Self::NotModified(page) => &page.state,
        }
    }

    /// Cost reported by the data source
    pub fn request_charge(&self) -> f64 {
        match self {
            Self::Success(page) => page.request_charge,
            Self::NotModified(page) => page.request_charge,
        }
    }

    /// Request correlation id
    pub fn activity_id(&self) -> &str {
        match self {
            Self::Success(page) => &page.activity_id,
            Self::NotModified(page) => &page.activity_id,
        }
    }

    /// Whether this page reports no changes
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::NotModified(_))
    }

    /// Number of items returned
    pub fn item_count(&self) -> usize {
        match self {
            Self::Success(page) => page.item_count,
            Self::NotModified(_) => 0,
        }
    }
}

/// Outcome of a single fetch
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeFeedResponse {
    /// Changes were returned
    Success(ChangeFeedSuccessPage),
    /// Nothing changed since the cursor
    NotModified(ChangeFeedNotModifiedPage),
    /// The range no longer exists; its key space moved to successor ranges
    Gone,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Fetches change feed pages for one range
#[async_trait]
pub trait ChangeFeedDataSource: Send + Sync {
    /// Fetch the next page after `state`.
    ///
    /// Archival ranges must be routed through their routing range while
    /// returning the data range's history.
    async fn fetch(
        &self,
        state: &FeedRangeState,
        options: &ChangeFeedPaginationOptions,
    ) -> Result<ChangeFeedResponse>;

    /// Id of the collection the feed belongs to
    fn resource_identifier(&self) -> &str;
}

/// Reports the current range topology
#[async_trait]
pub trait FeedRangeProvider: Send + Sync {
    /// All current physical ranges
    async fn get_feed_ranges(&self) -> Result<Vec<PartitionKeyRange>>;

    /// Current physical ranges overlapping `bounds`, ordered by key
    async fn get_overlapping_ranges(
        &self,
        bounds: &FeedRangeEpk,
        force_refresh: bool,
    ) -> Result<Vec<PartitionKeyRange>>;

    /// Archival partitions holding the history of `range`.
    ///
    /// Physical ranges are rebuilt from the lineage of their current
    /// successors. An archival range is its own archive. Logical ranges have
    /// no lineage and no archive.
    async fn get_archival_ranges(&self, range: &FeedRange) -> Result<Vec<FeedRangeArchivalPartition>> {
        match range {
            FeedRange::Epk(_) => Ok(Vec::new()),
            FeedRange::Archival(archival) => Ok(vec![archival.clone()]),
            FeedRange::PartitionKeyRange(range) => {
                let successors = self.get_overlapping_ranges(&range.bounds(), true).await?;
                ArchivalPartitionHelper::create_archival_partitions(&range.id, &successors)
            }
        }
    }
}
