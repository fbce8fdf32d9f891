//! Single-range enumerator implementations

use super::types::{EnumeratorStatus, MoveNextOutcome, PartitionRangePageAsyncEnumerator};
use crate::archival::FeedRangeArchivalPartition;
use crate::error::Result;
use crate::range::FeedRange;
use crate::source::{
    ChangeFeedDataSource, ChangeFeedPage, ChangeFeedPaginationOptions, ChangeFeedResponse,
};
use crate::state::{ChangeFeedState, FeedRangeState};
use async_trait::async_trait;
use tracing::{debug, info};

/// Record a page and advance the cursor
fn accept_page(
    state: &mut FeedRangeState,
    status: &mut EnumeratorStatus,
    current: &mut Option<ChangeFeedPage>,
    page: ChangeFeedPage,
) -> MoveNextOutcome {
    state.state = page.state().clone();
    *status = EnumeratorStatus::HasPage;
    *current = Some(page.clone());
    MoveNextOutcome::Page(page)
}

// ============================================================================
// Live Range Enumerator
// ============================================================================

/// Reads a live range, either logical or physical
#[derive(Debug, Clone)]
pub struct LiveRangeEnumerator {
    state: FeedRangeState,
    status: EnumeratorStatus,
    current: Option<ChangeFeedPage>,
}

impl LiveRangeEnumerator {
    /// Create an enumerator resuming from `state`
    pub fn new(state: FeedRangeState) -> Self {
        Self {
            state,
            status: EnumeratorStatus::Unstarted,
            current: None,
        }
    }
}

#[async_trait]
impl PartitionRangePageAsyncEnumerator for LiveRangeEnumerator {
    fn feed_range_state(&self) -> &FeedRangeState {
        &self.state
    }

    fn status(&self) -> EnumeratorStatus {
        self.status
    }

    fn current(&self) -> Option<&ChangeFeedPage> {
        self.current.as_ref()
    }

    async fn move_next(
        &mut self,
        source: &dyn ChangeFeedDataSource,
        options: &ChangeFeedPaginationOptions,
    ) -> Result<MoveNextOutcome> {
        // Nothing is mutated until the fetch resolves
        let response = source.fetch(&self.state, options).await?;

        Ok(match response {
            ChangeFeedResponse::Success(page) => accept_page(
                &mut self.state,
                &mut self.status,
                &mut self.current,
                ChangeFeedPage::Success(page),
            ),
            ChangeFeedResponse::NotModified(page) => accept_page(
                &mut self.state,
                &mut self.status,
                &mut self.current,
                ChangeFeedPage::NotModified(page),
            ),
            ChangeFeedResponse::Gone => {
                debug!(range = %self.state.feed_range, "Range is gone");
                self.status = EnumeratorStatus::Failed;
                MoveNextOutcome::Split
            }
        })
    }
}

// ============================================================================
// Archival Range Enumerator
// ============================================================================

/// Reads the history of a split ancestor until it drains
#[derive(Debug, Clone)]
pub struct ArchivalRangeEnumerator {
    state: FeedRangeState,
    status: EnumeratorStatus,
    current: Option<ChangeFeedPage>,
}

impl ArchivalRangeEnumerator {
    /// Create an enumerator over `partition` resuming from `state`
    pub fn new(partition: FeedRangeArchivalPartition, state: ChangeFeedState) -> Self {
        Self {
            state: FeedRangeState::new(partition, state),
            status: EnumeratorStatus::Unstarted,
            current: None,
        }
    }

    /// Archival partition being read
    pub fn partition(&self) -> Option<&FeedRangeArchivalPartition> {
        self.state.feed_range.as_archival()
    }

    /// Whether the archive has no history left
    pub fn is_drained(&self) -> bool {
        self.status == EnumeratorStatus::Drained
    }
}

#[async_trait]
impl PartitionRangePageAsyncEnumerator for ArchivalRangeEnumerator {
    fn feed_range_state(&self) -> &FeedRangeState {
        &self.state
    }

    fn status(&self) -> EnumeratorStatus {
        self.status
    }

    fn current(&self) -> Option<&ChangeFeedPage> {
        self.current.as_ref()
    }

    async fn move_next(
        &mut self,
        source: &dyn ChangeFeedDataSource,
        options: &ChangeFeedPaginationOptions,
    ) -> Result<MoveNextOutcome> {
        if self.is_drained() {
            return Ok(MoveNextOutcome::Split);
        }

        // Nothing is mutated until the fetch resolves
        let response = source.fetch(&self.state, options).await?;

        Ok(match response {
            ChangeFeedResponse::Success(page) => accept_page(
                &mut self.state,
                &mut self.status,
                &mut self.current,
                ChangeFeedPage::Success(page),
            ),
            ChangeFeedResponse::NotModified(_) => {
                info!(range = %self.state.feed_range, "Archival partition drained");
                self.status = EnumeratorStatus::Drained;
                MoveNextOutcome::Split
            }
            ChangeFeedResponse::Gone => {
                debug!(range = %self.state.feed_range, "Archival routing range is gone");
                self.status = EnumeratorStatus::Failed;
                MoveNextOutcome::Split
            }
        })
    }
}

// ============================================================================
// Range Enumerator
// ============================================================================

/// Either kind of single-range enumerator
#[derive(Debug, Clone)]
pub enum RangeEnumerator {
    /// Live logical or physical range
    Live(LiveRangeEnumerator),
    /// Archival partition
    Archival(ArchivalRangeEnumerator),
}

impl RangeEnumerator {
    /// Live enumerator resuming from `state`
    pub fn live(state: FeedRangeState) -> Self {
        Self::Live(LiveRangeEnumerator::new(state))
    }

    /// Archival enumerator over `partition`
    pub fn archival(partition: FeedRangeArchivalPartition, state: ChangeFeedState) -> Self {
        Self::Archival(ArchivalRangeEnumerator::new(partition, state))
    }

    /// Enumerator matching the kind of range in `state`
    pub fn for_state(state: FeedRangeState) -> Self {
        match state.feed_range {
            FeedRange::Archival(partition) => Self::archival(partition, state.state),
            _ => Self::live(state),
        }
    }

    /// Whether this reads an archival partition
    pub fn is_archival(&self) -> bool {
        matches!(self, Self::Archival(_))
    }

    /// The archival enumerator, if this is one
    pub fn as_archival(&self) -> Option<&ArchivalRangeEnumerator> {
        match self {
            Self::Archival(archival) => Some(archival),
            Self::Live(_) => None,
        }
    }
}

#[async_trait]
impl PartitionRangePageAsyncEnumerator for RangeEnumerator {
    fn feed_range_state(&self) -> &FeedRangeState {
        match self {
            Self::Live(live) => live.feed_range_state(),
            Self::Archival(archival) => archival.feed_range_state(),
        }
    }

    fn status(&self) -> EnumeratorStatus {
        match self {
            Self::Live(live) => live.status(),
            Self::Archival(archival) => archival.status(),
        }
    }

    fn current(&self) -> Option<&ChangeFeedPage> {
        match self {
            Self::Live(live) => live.current(),
            Self::Archival(archival) => archival.current(),
        }
    }

    async fn move_next(
        &mut self,
        source: &dyn ChangeFeedDataSource,
        options: &ChangeFeedPaginationOptions,
    ) -> Result<MoveNextOutcome> {
        match self {
            Self::Live(live) => live.move_next(source, options).await,
            Self::Archival(archival) => archival.move_next(source, options).await,
        }
    }
}
