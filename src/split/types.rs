//! Split handling types and traits

use super::queue::EnumeratorQueue;
use crate::error::Result;
use async_trait::async_trait;

/// What a strategy did with a failed enumerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitOutcome {
    /// Enumerators put in place of the failed one
    pub replacements: usize,
    /// How many of them read archival partitions
    pub archival_replacements: usize,
    /// Whether the failed enumerator was a drained archive
    pub drained: bool,
}

/// Replaces an enumerator whose range split or drained
#[async_trait]
pub trait SplitStrategy: Send + Sync {
    /// Replace the enumerator at the front of `queue`.
    ///
    /// Replacements are computed before the queue is touched and take the
    /// failed enumerator's place in one step. On error the queue is left
    /// exactly as it was.
    async fn handle_split(&self, queue: &mut EnumeratorQueue) -> Result<SplitOutcome>;
}
