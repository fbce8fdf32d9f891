//! Work queue of range enumerators

use crate::enumerator::{PartitionRangePageAsyncEnumerator, RangeEnumerator};
use crate::state::{ChangeFeedCrossFeedRangeState, FeedRangeState};
use std::collections::VecDeque;

/// Round-robin queue of enumerators; the front one is read next
#[derive(Debug, Clone, Default)]
pub struct EnumeratorQueue {
    enumerators: VecDeque<RangeEnumerator>,
}

impl EnumeratorQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// One enumerator per range state, in order
    pub fn from_states(states: impl IntoIterator<Item = FeedRangeState>) -> Self {
        Self {
            enumerators: states.into_iter().map(RangeEnumerator::for_state).collect(),
        }
    }

    /// Enumerator read next
    pub fn front(&self) -> Option<&RangeEnumerator> {
        self.enumerators.front()
    }

    /// Mutable access to the enumerator read next
    pub fn front_mut(&mut self) -> Option<&mut RangeEnumerator> {
        self.enumerators.front_mut()
    }

    /// Move the front enumerator to the back
    pub fn rotate(&mut self) {
        if let Some(front) = self.enumerators.pop_front() {
            self.enumerators.push_back(front);
        }
    }

    /// Add an enumerator at the back
    pub fn push_back(&mut self, enumerator: RangeEnumerator) {
        self.enumerators.push_back(enumerator);
    }

    /// Replace the front enumerator with `replacements`, in order.
    ///
    /// Returns the removed enumerator. An empty queue is left unchanged and
    /// the replacements are dropped.
    pub fn replace_front(&mut self, replacements: Vec<RangeEnumerator>) -> Option<RangeEnumerator> {
        let removed = self.enumerators.pop_front()?;
        for enumerator in replacements.into_iter().rev() {
            self.enumerators.push_front(enumerator);
        }
        Some(removed)
    }

    /// Cursor of every enumerator, in queue order
    pub fn snapshot(&self) -> ChangeFeedCrossFeedRangeState {
        ChangeFeedCrossFeedRangeState::new(
            self.enumerators
                .iter()
                .map(|e| e.feed_range_state().clone())
                .collect(),
        )
    }

    /// Iterate the enumerators in queue order
    pub fn iter(&self) -> impl Iterator<Item = &RangeEnumerator> {
        self.enumerators.iter()
    }

    /// Number of enumerators
    pub fn len(&self) -> usize {
        self.enumerators.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.enumerators.is_empty()
    }
}
