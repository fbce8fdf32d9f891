//! Archival partition type

use super::graph::SplitGraph;
use crate::error::{Error, Result};
use crate::range::FeedRangeEpk;
use serde::{Deserialize, Serialize};

/// A synthetic range that reads the history of a split ancestor.
///
/// Requests are routed through `routing_range_id`, a live descendant, while
/// asking for the data of `data_range_id`, the archived root of the split
/// tree. The archive is drained once the data source answers not-modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ArchivalPartitionRepr")]
pub struct FeedRangeArchivalPartition {
    data_range_id: String,
    routing_range_id: String,
    #[serde(skip_serializing)]
    bounds: FeedRangeEpk,
    split_graph: SplitGraph,
}

#[derive(Deserialize)]
struct ArchivalPartitionRepr {
    data_range_id: String,
    routing_range_id: String,
    split_graph: SplitGraph,
}

impl TryFrom<ArchivalPartitionRepr> for FeedRangeArchivalPartition {
    type Error = String;

    fn try_from(repr: ArchivalPartitionRepr) -> std::result::Result<Self, Self::Error> {
        let partition = Self::new(repr.split_graph).map_err(|e| e.to_string())?;
        if partition.data_range_id != repr.data_range_id {
            return Err(format!(
                "archival data range {} does not match split graph root {}",
                repr.data_range_id, partition.data_range_id
            ));
        }
        if partition.routing_range_id != repr.routing_range_id {
            return Err(format!(
                "archival routing range {} does not match split graph routing leaf {}",
                repr.routing_range_id, partition.routing_range_id
            ));
        }
        Ok(partition)
    }
}

impl FeedRangeArchivalPartition {
    /// Wrap a split tree. The root is the archived range, the routing range
    /// is the tree's routing leaf.
    pub fn new(split_graph: SplitGraph) -> Result<Self> {
        let root = split_graph.root_id().to_string();
        if split_graph.root().is_some_and(|node| node.is_leaf()) {
            return Err(Error::topology(
                root,
                "archival partition needs a split graph with at least one child",
            ));
        }
        let routing_range_id = split_graph
            .routing_leaf()
            .map(|leaf| leaf.range_id.clone())
            .ok_or_else(|| Error::topology(root.clone(), "split graph has no routing leaf"))?;
        let bounds = split_graph
            .bounds()
            .ok_or_else(|| Error::topology(root.clone(), "split graph has no leaf ranges"))?;

        Ok(Self {
            data_range_id: root,
            routing_range_id,
            bounds,
            split_graph,
        })
    }

    /// Id of the archived range whose history is read
    pub fn data_range_id(&self) -> &str {
        &self.data_range_id
    }

    /// Id of the live range requests are routed through
    pub fn routing_range_id(&self) -> &str {
        &self.routing_range_id
    }

    /// Split tree below the archived range
    pub fn split_graph(&self) -> &SplitGraph {
        &self.split_graph
    }

    /// Key space covered by the archive
    pub fn bounds(&self) -> FeedRangeEpk {
        self.bounds.clone()
    }
}
