//! Cursor types for tracking change feed progress
//!
//! These types are serialized into continuation tokens and persisted
//! between runs.

use crate::range::{midpoint, FeedRange, FeedRangeEpk};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Change Feed State
// ============================================================================

/// Where reading resumes within one range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ChangeFeedState {
    /// Every change ever recorded
    Beginning,
    /// Only changes made after the first request
    Now,
    /// Changes made at or after the timestamp
    Time(DateTime<Utc>),
    /// Opaque position returned by the data source
    Continuation(String),
}

impl ChangeFeedState {
    /// Start from the beginning of the feed
    pub fn beginning() -> Self {
        Self::Beginning
    }

    /// Start from the current time
    pub fn now() -> Self {
        Self::Now
    }

    /// Start from a point in time
    pub fn time(timestamp: DateTime<Utc>) -> Self {
        Self::Time(timestamp)
    }

    /// Resume from an opaque continuation
    pub fn continuation(token: impl Into<String>) -> Self {
        Self::Continuation(token.into())
    }

    /// Whether this is the `Now` start position
    pub fn is_now(&self) -> bool {
        matches!(self, Self::Now)
    }

    /// The opaque continuation, if this state carries one
    pub fn continuation_token(&self) -> Option<&str> {
        match self {
            Self::Continuation(token) => Some(token),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeFeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => write!(f, "beginning"),
            Self::Now => write!(f, "now"),
            Self::Time(timestamp) => write!(f, "time {}", timestamp.to_rfc3339()),
            Self::Continuation(token) => write!(f, "continuation {token}"),
        }
    }
}

// ============================================================================
// Feed Range State
// ============================================================================

/// A range bound to its cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRangeState {
    /// Range the cursor applies to
    #[serde(rename = "FeedRange")]
    pub feed_range: FeedRange,
    /// Resume point within the range
    #[serde(rename = "State")]
    pub state: ChangeFeedState,
}

impl FeedRangeState {
    /// Bind a cursor to a range
    pub fn new(feed_range: impl Into<FeedRange>, state: ChangeFeedState) -> Self {
        Self {
            feed_range: feed_range.into(),
            state,
        }
    }

    /// Same range with a new cursor
    #[must_use]
    pub fn with_state(&self, state: ChangeFeedState) -> Self {
        Self {
            feed_range: self.feed_range.clone(),
            state,
        }
    }
}

// ============================================================================
// Cross Feed Range State
// ============================================================================

/// Cursor over a whole scope, one entry per range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeFeedCrossFeedRangeState {
    feed_range_states: Vec<FeedRangeState>,
}

impl ChangeFeedCrossFeedRangeState {
    /// Create from explicit range states
    pub fn new(feed_range_states: Vec<FeedRangeState>) -> Self {
        Self { feed_range_states }
    }

    /// Read `range` from the beginning
    pub fn create_from_beginning(range: impl Into<FeedRange>) -> Self {
        Self::single(range, ChangeFeedState::Beginning)
    }

    /// Read `range` from now on
    pub fn create_from_now(range: impl Into<FeedRange>) -> Self {
        Self::single(range, ChangeFeedState::Now)
    }

    /// Read `range` from a point in time
    pub fn create_from_time(timestamp: DateTime<Utc>, range: impl Into<FeedRange>) -> Self {
        Self::single(range, ChangeFeedState::Time(timestamp))
    }

    fn single(range: impl Into<FeedRange>, state: ChangeFeedState) -> Self {
        Self::new(vec![FeedRangeState::new(range, state)])
    }

    /// Range states in order
    pub fn feed_range_states(&self) -> &[FeedRangeState] {
        &self.feed_range_states
    }

    /// Consume into the range states
    pub fn into_feed_range_states(self) -> Vec<FeedRangeState> {
        self.feed_range_states
    }

    /// Number of ranges
    pub fn len(&self) -> usize {
        self.feed_range_states.len()
    }

    /// Whether no range is tracked
    pub fn is_empty(&self) -> bool {
        self.feed_range_states.is_empty()
    }

    /// Iterate the range states
    pub fn iter(&self) -> std::slice::Iter<'_, FeedRangeState> {
        self.feed_range_states.iter()
    }

    /// Concatenate two cursors, this one first
    #[must_use]
    pub fn merge(&self, other: &ChangeFeedCrossFeedRangeState) -> Self {
        let mut merged = self.feed_range_states.clone();
        merged.extend(other.feed_range_states.iter().cloned());
        Self::new(merged)
    }

    /// Split into two cursors covering the same key space.
    ///
    /// Several ranges are divided at the list midpoint. A single `Epk` or
    /// physical range is bisected at the key midpoint, each half keeping the
    /// cursor. Returns `None` when no split is possible.
    pub fn try_split(&self) -> Option<(Self, Self)> {
        match self.feed_range_states.as_slice() {
            [] => None,
            [single] => {
                let bounds = match &single.feed_range {
                    FeedRange::Epk(epk) => epk.clone(),
                    FeedRange::PartitionKeyRange(range) => range.bounds(),
                    FeedRange::Archival(_) => return None,
                };
                let mid = midpoint(&bounds.min, &bounds.max)?;
                let left = FeedRangeEpk::new(bounds.min, mid.clone());
                let right = FeedRangeEpk::new(mid, bounds.max);
                Some((
                    Self::single(left, single.state.clone()),
                    Self::single(right, single.state.clone()),
                ))
            }
            states => {
                let (left, right) = states.split_at(states.len() / 2);
                Some((Self::new(left.to_vec()), Self::new(right.to_vec())))
            }
        }
    }
}

impl From<Vec<FeedRangeState>> for ChangeFeedCrossFeedRangeState {
    fn from(feed_range_states: Vec<FeedRangeState>) -> Self {
        Self::new(feed_range_states)
    }
}

impl<'a> IntoIterator for &'a ChangeFeedCrossFeedRangeState {
    type Item = &'a FeedRangeState;
    type IntoIter = std::slice::Iter<'a, FeedRangeState>;

    fn into_iter(self) -> Self::IntoIter {
        self.feed_range_states.iter()
    }
}
