//! Split strategy implementations

use super::queue::EnumeratorQueue;
use super::types::{SplitOutcome, SplitStrategy};
use crate::archival::FeedRangeArchivalPartition;
use crate::enumerator::{PartitionRangePageAsyncEnumerator, RangeEnumerator};
use crate::error::{Error, Result};
use crate::range::{FeedRange, FeedRangeEpk};
use crate::source::FeedRangeProvider;
use crate::state::{ChangeFeedState, FeedRangeState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Current ranges covering `bounds`, ordered by key.
///
/// A physical range lying entirely inside `bounds` is kept as is; one that
/// only partly overlaps contributes the shared slice as a logical range.
pub async fn resolve_child_ranges(
    provider: &dyn FeedRangeProvider,
    bounds: &FeedRangeEpk,
    force_refresh: bool,
) -> Result<Vec<FeedRange>> {
    let overlapping = provider.get_overlapping_ranges(bounds, force_refresh).await?;

    let mut children: Vec<FeedRange> = overlapping
        .into_iter()
        .filter_map(|range| {
            if bounds.contains(&range.bounds()) {
                Some(FeedRange::PartitionKeyRange(range))
            } else {
                bounds.intersect(&range.bounds()).map(FeedRange::Epk)
            }
        })
        .collect();
    children.sort_by(|a, b| a.bounds().min.cmp(&b.bounds().min));
    Ok(children)
}

fn empty_queue() -> Error {
    Error::topology("", "split requested on an empty queue")
}

// ============================================================================
// Default Strategy
// ============================================================================

/// Replaces a split range with the current ranges covering it
#[derive(Clone)]
pub struct DefaultSplitStrategy {
    provider: Arc<dyn FeedRangeProvider>,
}

impl DefaultSplitStrategy {
    /// Create a strategy backed by `provider`
    pub fn new(provider: Arc<dyn FeedRangeProvider>) -> Self {
        Self { provider }
    }

    async fn children(&self, failed: &FeedRangeState) -> Result<Vec<RangeEnumerator>> {
        let children =
            resolve_child_ranges(self.provider.as_ref(), &failed.feed_range.bounds(), true).await?;

        if children.is_empty() {
            return Err(Error::topology(
                failed.feed_range.to_string(),
                "no current range covers the split range",
            ));
        }
        if let [only] = children.as_slice() {
            if *only == failed.feed_range {
                warn!(range = %failed.feed_range, "Split reported but topology is unchanged");
                return Err(Error::topology(
                    failed.feed_range.to_string(),
                    "range reported gone but is still current",
                ));
            }
        }

        Ok(children
            .into_iter()
            .map(|range| RangeEnumerator::live(FeedRangeState::new(range, failed.state.clone())))
            .collect())
    }
}

impl std::fmt::Debug for DefaultSplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultSplitStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl SplitStrategy for DefaultSplitStrategy {
    async fn handle_split(&self, queue: &mut EnumeratorQueue) -> Result<SplitOutcome> {
        let failed = queue
            .front()
            .map(|e| e.feed_range_state().clone())
            .ok_or_else(empty_queue)?;

        let replacements = self.children(&failed).await?;
        let outcome = SplitOutcome {
            replacements: replacements.len(),
            ..SplitOutcome::default()
        };

        info!(
            range = %failed.feed_range,
            children = outcome.replacements,
            "Replacing split range"
        );
        queue.replace_front(replacements);
        Ok(outcome)
    }
}

// ============================================================================
// Full Fidelity Strategy
// ============================================================================

/// Reads the history of a split range before its successors.
///
/// A split range is first replaced by an archival enumerator. Once the
/// archive drains, each child of the archived range takes over: leaves as
/// live ranges, interior nodes as archives of their own subtree.
#[derive(Clone)]
pub struct FullFidelityChangeFeedSplitStrategy {
    provider: Arc<dyn FeedRangeProvider>,
    fallback: DefaultSplitStrategy,
}

impl FullFidelityChangeFeedSplitStrategy {
    /// Create a strategy backed by `provider`
    pub fn new(provider: Arc<dyn FeedRangeProvider>) -> Self {
        Self {
            fallback: DefaultSplitStrategy::new(Arc::clone(&provider)),
            provider,
        }
    }

    /// One enumerator per child of the archived range, ordered by key
    fn fan_out(
        partition: &FeedRangeArchivalPartition,
        cursor: &ChangeFeedState,
    ) -> Result<Vec<RangeEnumerator>> {
        let graph = partition.split_graph();
        let mut replacements = graph
            .root_children()
            .into_iter()
            .map(|child| -> Result<RangeEnumerator> {
                if child.is_leaf() {
                    let range = child.range.clone().ok_or_else(|| {
                        Error::topology(child.range_id.clone(), "leaf has no range descriptor")
                    })?;
                    Ok(RangeEnumerator::live(FeedRangeState::new(range, cursor.clone())))
                } else {
                    let subtree = graph.subtree(&child.range_id).ok_or_else(|| {
                        Error::topology(child.range_id.clone(), "subtree missing from split graph")
                    })?;
                    Ok(RangeEnumerator::archival(
                        FeedRangeArchivalPartition::new(subtree)?,
                        cursor.clone(),
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        replacements.sort_by(|a, b| {
            let a = a.feed_range_state().feed_range.bounds();
            let b = b.feed_range_state().feed_range.bounds();
            a.min.cmp(&b.min)
        });
        Ok(replacements)
    }
}

impl std::fmt::Debug for FullFidelityChangeFeedSplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullFidelityChangeFeedSplitStrategy")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SplitStrategy for FullFidelityChangeFeedSplitStrategy {
    async fn handle_split(&self, queue: &mut EnumeratorQueue) -> Result<SplitOutcome> {
        let front = queue.front().ok_or_else(empty_queue)?;
        let failed = front.feed_range_state().clone();
        let drained = front.as_archival().map(|archival| archival.is_drained());

        // Changes made after `Now` have no history worth replaying
        if failed.state.is_now() {
            debug!(range = %failed.feed_range, "Split of a Now cursor, skipping archives");
            return self.fallback.handle_split(queue).await;
        }

        let archives = self.provider.get_archival_ranges(&failed.feed_range).await?;
        if archives.is_empty() {
            debug!(range = %failed.feed_range, "No archival lineage, using current ranges");
            return self.fallback.handle_split(queue).await;
        }

        let (replacements, drained) = match drained {
            Some(false) => {
                return Err(Error::not_supported(format!(
                    "{} split before its archive was drained",
                    failed.feed_range
                )));
            }
            Some(true) => {
                let partition = failed.feed_range.as_archival().ok_or_else(|| {
                    Error::topology(failed.feed_range.to_string(), "archival enumerator without archive")
                })?;
                (Self::fan_out(partition, &failed.state)?, true)
            }
            None => {
                let replacements = archives
                    .into_iter()
                    .map(|partition| RangeEnumerator::archival(partition, failed.state.clone()))
                    .collect();
                (replacements, false)
            }
        };

        let outcome = SplitOutcome {
            replacements: replacements.len(),
            archival_replacements: replacements.iter().filter(|e| e.is_archival()).count(),
            drained,
        };
        info!(
            range = %failed.feed_range,
            drained,
            replacements = outcome.replacements,
            archival = outcome.archival_replacements,
            "Replacing range with archival lineage"
        );
        queue.replace_front(replacements);
        Ok(outcome)
    }
}
