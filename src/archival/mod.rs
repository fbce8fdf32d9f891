//! Archival partition module
//!
//! Reconstructs split lineage and models archival partitions.
//!
//! # Overview
//!
//! When a range splits in full-fidelity mode, its history stays behind in an
//! archive. The archive is read through a live descendant (the routing range)
//! before any of the live children are touched:
//! - `ArchivalPartitionHelper` - rebuilds the split tree from successor lineages
//! - `SplitGraph` - arena of `SplitGraphNode`s keyed by range id
//! - `FeedRangeArchivalPartition` - a split tree plus its routing range

mod graph;
mod helper;
mod types;

pub use graph::{SplitGraph, SplitGraphNode};
pub use helper::ArchivalPartitionHelper;
pub use types::FeedRangeArchivalPartition;
