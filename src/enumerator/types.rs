//! Enumerator types and traits

use crate::error::Result;
use crate::source::{ChangeFeedDataSource, ChangeFeedPage, ChangeFeedPaginationOptions};
use crate::state::FeedRangeState;
use async_trait::async_trait;

/// Lifecycle of a single-range enumerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumeratorStatus {
    /// No fetch attempted yet
    #[default]
    Unstarted,
    /// The last fetch returned a page
    HasPage,
    /// An archival range has no history left
    Drained,
    /// The range is gone
    Failed,
}

/// Result of advancing an enumerator
#[derive(Debug, Clone, PartialEq)]
pub enum MoveNextOutcome {
    /// A page was read and the cursor advanced
    Page(ChangeFeedPage),
    /// The range must be replaced; the cursor did not move
    Split,
}

impl MoveNextOutcome {
    /// Whether the enumerator asked to be replaced
    pub fn is_split(&self) -> bool {
        matches!(self, Self::Split)
    }
}

/// Reads pages for one range
#[async_trait]
pub trait PartitionRangePageAsyncEnumerator: Send + Sync {
    /// Range and cursor this enumerator owns
    fn feed_range_state(&self) -> &FeedRangeState;

    /// Current lifecycle status
    fn status(&self) -> EnumeratorStatus;

    /// Last page read, if any
    fn current(&self) -> Option<&ChangeFeedPage>;

    /// Fetch the next page.
    ///
    /// The cursor only moves when a page is returned. Splits, drains, errors
    /// and a dropped future all leave it where it was.
    async fn move_next(
        &mut self,
        source: &dyn ChangeFeedDataSource,
        options: &ChangeFeedPaginationOptions,
    ) -> Result<MoveNextOutcome>;
}
