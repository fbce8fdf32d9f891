//! Engine types
//!
//! Pages yielded by the driver and read statistics.

use crate::error::Result;
use crate::source::ChangeFeedPage;
use crate::state::ChangeFeedCrossFeedRangeState;
use crate::types::JsonValue;

/// A page yielded by the cross-range driver
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFeedRangePage {
    /// Page from the range that was read last
    pub page: ChangeFeedPage,
    /// Charge of every fetch made while producing this page
    pub request_charge: f64,
    /// Cursor over the whole scope after this page
    pub state: ChangeFeedCrossFeedRangeState,
    /// `state` encoded the way the driver encodes its continuations
    pub continuation: String,
}

impl CrossFeedRangePage {
    /// Create a page
    pub fn new(
        page: ChangeFeedPage,
        request_charge: f64,
        state: ChangeFeedCrossFeedRangeState,
        continuation: String,
    ) -> Self {
        Self {
            page,
            request_charge,
            state,
            continuation,
        }
    }

    /// Whether no range had changes
    pub fn is_not_modified(&self) -> bool {
        self.page.is_not_modified()
    }

    /// Number of items returned
    pub fn item_count(&self) -> usize {
        self.page.item_count()
    }

    /// Decode JSON items; not-modified pages have none
    pub fn json_items(&self) -> Result<Vec<JsonValue>> {
        match &self.page {
            ChangeFeedPage::Success(page) => page.json_items(),
            ChangeFeedPage::NotModified(_) => Ok(Vec::new()),
        }
    }

    /// Continuation token resuming after this page
    pub fn continuation(&self) -> &str {
        &self.continuation
    }
}

/// Statistics from a change feed read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeFeedStats {
    /// Pages fetched from any range, including not-modified ones
    pub pages_fetched: usize,
    /// Fetches that found no changes
    pub not_modified_pages: usize,
    /// Items returned
    pub items: usize,
    /// Splits handled, including archival drains
    pub splits: usize,
    /// Archival partitions drained
    pub archival_drains: usize,
    /// Errors returned to the caller
    pub errors: usize,
    /// Total charge reported by the data source
    pub request_charge: f64,
}

impl ChangeFeedStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fetched page
    pub fn add_page(&mut self, page: &ChangeFeedPage) {
        self.pages_fetched += 1;
        if page.is_not_modified() {
            self.not_modified_pages += 1;
        }
        self.items += page.item_count();
        self.request_charge += page.request_charge();
    }

    /// Add a handled split
    pub fn add_split(&mut self, drained: bool) {
        self.splits += 1;
        if drained {
            self.archival_drains += 1;
        }
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }
}
