//! Range descriptor types
//!
//! Defines the key-space slices a cursor can be bound to.

use crate::archival::FeedRangeArchivalPartition;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Inclusive lower bound of the whole key space
pub const MIN_EPK: &str = "";

/// Exclusive upper bound of the whole key space
pub const MAX_EPK: &str = "FF";

/// Compare two range ids.
///
/// Ids are numeric in practice and compare as integers; anything else falls
/// back to ordinal string order.
pub fn compare_range_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

// ============================================================================
// Effective Partition Key Range
// ============================================================================

/// A logical `[min, max)` slice of the key space
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedRangeEpk {
    /// Inclusive lower bound
    pub min: String,
    /// Exclusive upper bound
    pub max: String,
}

impl FeedRangeEpk {
    /// Create a new range
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// The whole key space
    pub fn full_range() -> Self {
        Self::new(MIN_EPK, MAX_EPK)
    }

    /// Whether the range contains no keys
    pub fn is_empty(&self) -> bool {
        self.min >= self.max
    }

    /// Whether `other` lies entirely inside this range
    pub fn contains(&self, other: &FeedRangeEpk) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Whether the two ranges share at least one key
    pub fn overlaps(&self, other: &FeedRangeEpk) -> bool {
        self.min < other.max && other.min < self.max
    }

    /// The keys shared by both ranges, if any
    pub fn intersect(&self, other: &FeedRangeEpk) -> Option<FeedRangeEpk> {
        if !self.overlaps(other) {
            return None;
        }
        let min = if self.min >= other.min {
            &self.min
        } else {
            &other.min
        };
        let max = if self.max <= other.max {
            &self.max
        } else {
            &other.max
        };
        Some(FeedRangeEpk::new(min.clone(), max.clone()))
    }
}

impl fmt::Display for FeedRangeEpk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

// ============================================================================
// Partition Key Range
// ============================================================================

/// A physical partition range as reported by the range provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyRange {
    /// Range id
    pub id: String,
    /// Inclusive lower bound
    pub min: String,
    /// Exclusive upper bound
    pub max: String,
    /// Ancestor ids, root first, immediate parent last
    #[serde(default)]
    pub parents: Vec<String>,
}

impl PartitionKeyRange {
    /// Create a root range (no ancestors)
    pub fn new(id: impl Into<String>, min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min: min.into(),
            max: max.into(),
            parents: Vec::new(),
        }
    }

    /// Set the ancestor chain
    #[must_use]
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Create a successor of this range covering `[min, max)`
    pub fn child(&self, id: impl Into<String>, min: impl Into<String>, max: impl Into<String>) -> Self {
        let mut parents = self.parents.clone();
        parents.push(self.id.clone());
        Self {
            id: id.into(),
            min: min.into(),
            max: max.into(),
            parents,
        }
    }

    /// Key-space bounds of this range
    pub fn bounds(&self) -> FeedRangeEpk {
        FeedRangeEpk::new(self.min.clone(), self.max.clone())
    }

    /// The chain `[root, .., parent, self]`
    pub fn lineage(&self) -> Vec<String> {
        let mut lineage = self.parents.clone();
        lineage.push(self.id.clone());
        lineage
    }
}

impl fmt::Display for PartitionKeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {})", self.id, self.min, self.max)
    }
}

// ============================================================================
// Feed Range
// ============================================================================

/// The range a cursor is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedRange {
    /// Logical key-space slice
    Epk(FeedRangeEpk),
    /// Physical range with lineage
    PartitionKeyRange(PartitionKeyRange),
    /// Historical data of a split ancestor, routed through a live range
    Archival(FeedRangeArchivalPartition),
}

impl FeedRange {
    /// Logical range over `[min, max)`
    pub fn epk(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self::Epk(FeedRangeEpk::new(min, max))
    }

    /// The whole key space
    pub fn full_range() -> Self {
        Self::Epk(FeedRangeEpk::full_range())
    }

    /// Key-space bounds covered by this range
    pub fn bounds(&self) -> FeedRangeEpk {
        match self {
            Self::Epk(epk) => epk.clone(),
            Self::PartitionKeyRange(range) => range.bounds(),
            Self::Archival(archival) => archival.bounds(),
        }
    }

    /// Physical range id, if this range has one
    pub fn partition_key_range_id(&self) -> Option<&str> {
        match self {
            Self::PartitionKeyRange(range) => Some(&range.id),
            _ => None,
        }
    }

    /// Archival partition, if this is one
    pub fn as_archival(&self) -> Option<&FeedRangeArchivalPartition> {
        match self {
            Self::Archival(archival) => Some(archival),
            _ => None,
        }
    }

    /// Whether this is an archival partition
    pub fn is_archival(&self) -> bool {
        matches!(self, Self::Archival(_))
    }
}

impl From<FeedRangeEpk> for FeedRange {
    fn from(range: FeedRangeEpk) -> Self {
        Self::Epk(range)
    }
}

impl From<PartitionKeyRange> for FeedRange {
    fn from(range: PartitionKeyRange) -> Self {
        Self::PartitionKeyRange(range)
    }
}

impl From<FeedRangeArchivalPartition> for FeedRange {
    fn from(range: FeedRangeArchivalPartition) -> Self {
        Self::Archival(range)
    }
}

impl fmt::Display for FeedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epk(epk) => write!(f, "epk {epk}"),
            Self::PartitionKeyRange(range) => write!(f, "pkrange {range}"),
            Self::Archival(archival) => write!(
                f,
                "archival {} via {}",
                archival.data_range_id(),
                archival.routing_range_id()
            ),
        }
    }
}
