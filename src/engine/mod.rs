//! Execution engine module
//!
//! Main read loop over every range of a scope.
//!
//! # Overview
//!
//! The engine module provides:
//! - `CrossPartitionChangeFeedAsyncEnumerator` - drains the enumerator queue and yields pages
//! - `CrossFeedRangePage` - a page plus the cursor over the whole scope
//! - `ChangeFeedStats` - counters for pages, splits and charges

mod types;

pub use types::{ChangeFeedStats, CrossFeedRangePage};

use crate::config::ChangeFeedConfig;
use crate::continuation::{
    parse_versioned, serialize_continuation, serialize_legacy, serialize_versioned,
};
use crate::enumerator::{MoveNextOutcome, PartitionRangePageAsyncEnumerator, RangeEnumerator};
use crate::error::{Error, Result};
use crate::range::FeedRange;
use crate::source::{ChangeFeedDataSource, ChangeFeedPaginationOptions, FeedRangeProvider};
use crate::split::{
    resolve_child_ranges, DefaultSplitStrategy, EnumeratorQueue,
    FullFidelityChangeFeedSplitStrategy, SplitStrategy,
};
use crate::state::{ChangeFeedCrossFeedRangeState, FeedRangeState};
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads a change feed across every range of a scope.
///
/// Ranges are read round robin. A range that reports no changes hands over
/// to the next one until every range has been tried since the last change;
/// only then is a not-modified page yielded. Splits are resolved by the
/// configured `SplitStrategy` and never reach the caller.
pub struct CrossPartitionChangeFeedAsyncEnumerator {
    source: Arc<dyn ChangeFeedDataSource>,
    provider: Arc<dyn FeedRangeProvider>,
    strategy: Arc<dyn SplitStrategy>,
    queue: EnumeratorQueue,
    config: ChangeFeedConfig,
    options: ChangeFeedPaginationOptions,
    discovered: bool,
    stats: ChangeFeedStats,
}

impl CrossPartitionChangeFeedAsyncEnumerator {
    /// Create a driver resuming from `state`.
    ///
    /// The split strategy follows the configured mode.
    pub fn new(
        source: Arc<dyn ChangeFeedDataSource>,
        provider: Arc<dyn FeedRangeProvider>,
        state: ChangeFeedCrossFeedRangeState,
        config: ChangeFeedConfig,
    ) -> Result<Self> {
        config.validate()?;

        let strategy: Arc<dyn SplitStrategy> = if config.mode.preserves_history() {
            Arc::new(FullFidelityChangeFeedSplitStrategy::new(Arc::clone(&provider)))
        } else {
            Arc::new(DefaultSplitStrategy::new(Arc::clone(&provider)))
        };

        Ok(Self {
            source,
            provider,
            strategy,
            queue: EnumeratorQueue::from_states(state.into_feed_range_states()),
            options: config.pagination_options(),
            config,
            discovered: false,
            stats: ChangeFeedStats::default(),
        })
    }

    /// Create a driver from a continuation token.
    ///
    /// Accepts plain tokens and versioned envelopes issued for this data
    /// source's collection.
    pub fn from_continuation(
        source: Arc<dyn ChangeFeedDataSource>,
        provider: Arc<dyn FeedRangeProvider>,
        continuation: &str,
        config: ChangeFeedConfig,
    ) -> Result<Self> {
        let state = parse_versioned(continuation, source.resource_identifier())?;
        Self::new(source, provider, state, config)
    }

    /// Replace the split strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn SplitStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &ChangeFeedConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &ChangeFeedStats {
        &self.stats
    }

    /// Get the enumerator queue
    pub fn queue(&self) -> &EnumeratorQueue {
        &self.queue
    }

    /// Cursor over the whole scope
    pub fn state(&self) -> ChangeFeedCrossFeedRangeState {
        self.queue.snapshot()
    }

    /// Continuation token for the current cursor.
    ///
    /// Uses the legacy envelope when the config asks for it, a plain token
    /// otherwise. Pages carry the same encoding.
    pub fn continuation(&self) -> Result<String> {
        self.encode(&self.state())
    }

    fn encode(&self, state: &ChangeFeedCrossFeedRangeState) -> Result<String> {
        if !self.config.emit_legacy_continuation {
            return serialize_continuation(state);
        }

        let rid = self.source.resource_identifier();
        match serialize_legacy(state, rid) {
            // Cursors the legacy envelope cannot hold go out versioned
            Err(Error::NotSupported { message }) => {
                debug!(reason = %message, "Falling back to versioned continuation");
                serialize_versioned(state, rid)
            }
            other => other,
        }
    }

    /// Continuation token in the versioned envelope
    pub fn versioned_continuation(&self) -> Result<String> {
        serialize_versioned(&self.state(), self.source.resource_identifier())
    }

    /// Expand logical ranges into the physical ranges covering them
    async fn discover(&mut self) -> Result<()> {
        if self.discovered {
            return Ok(());
        }

        let mut enumerators = Vec::with_capacity(self.queue.len());
        for enumerator in self.queue.iter() {
            let state = enumerator.feed_range_state();
            let FeedRange::Epk(bounds) = &state.feed_range else {
                enumerators.push(enumerator.clone());
                continue;
            };

            let children = resolve_child_ranges(self.provider.as_ref(), bounds, false).await?;
            if children.is_empty() {
                enumerators.push(enumerator.clone());
                continue;
            }
            debug!(range = %state.feed_range, children = children.len(), "Resolved logical range");
            enumerators.extend(
                children
                    .into_iter()
                    .map(|range| RangeEnumerator::live(FeedRangeState::new(range, state.state.clone()))),
            );
        }

        let mut queue = EnumeratorQueue::new();
        for enumerator in enumerators {
            queue.push_back(enumerator);
        }
        self.queue = queue;
        self.discovered = true;
        Ok(())
    }

    /// Read the next page.
    ///
    /// Returns `None` once no range is left to read. On error the failing
    /// range keeps its cursor and stays first in line.
    pub async fn next_page(&mut self) -> Result<Option<CrossFeedRangePage>> {
        if let Err(e) = self.discover().await {
            self.stats.add_error();
            return Err(e);
        }

        let mut request_charge = 0.0;
        let mut unchanged = 0usize;

        loop {
            let Some(enumerator) = self.queue.front_mut() else {
                return Ok(None);
            };

            let outcome = match enumerator.move_next(self.source.as_ref(), &self.options).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.stats.add_error();
                    return Err(e);
                }
            };

            match outcome {
                MoveNextOutcome::Page(page) => {
                    self.stats.add_page(&page);
                    request_charge += page.request_charge();
                    self.queue.rotate();

                    if page.is_not_modified() {
                        unchanged += 1;
                        if unchanged < self.queue.len() {
                            continue;
                        }
                    }
                    let state = self.queue.snapshot();
                    let continuation = match self.encode(&state) {
                        Ok(continuation) => continuation,
                        Err(e) => {
                            self.stats.add_error();
                            return Err(e);
                        }
                    };
                    return Ok(Some(CrossFeedRangePage::new(
                        page,
                        request_charge,
                        state,
                        continuation,
                    )));
                }
                MoveNextOutcome::Split => {
                    let outcome = match self.strategy.handle_split(&mut self.queue).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            self.stats.add_error();
                            return Err(e);
                        }
                    };
                    self.stats.add_split(outcome.drained);
                    info!(
                        replacements = outcome.replacements,
                        ranges = self.queue.len(),
                        "Handled split"
                    );
                    unchanged = 0;
                }
            }
        }
    }

    /// Turn the driver into a stream of pages.
    ///
    /// The stream ends when no range is left or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<CrossFeedRangePage>> + Send {
        futures::stream::unfold(Some(self), |driver| async move {
            let mut driver = driver?;
            match driver.next_page().await {
                Ok(Some(page)) => Some((Ok(page), Some(driver))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl std::fmt::Debug for CrossPartitionChangeFeedAsyncEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossPartitionChangeFeedAsyncEnumerator")
            .field("queue", &self.queue)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
