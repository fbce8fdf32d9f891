//! Split lineage reconstruction
//!
//! Given a range that reported gone and the successors that now cover its
//! key space, rebuild the split tree rooted at the gone range.

use super::graph::{SplitGraph, SplitGraphNode};
use super::types::FeedRangeArchivalPartition;
use crate::error::{Error, Result};
use crate::range::PartitionKeyRange;
use std::collections::BTreeMap;
use tracing::debug;

/// Builds archival partitions from successor range lineages
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchivalPartitionHelper;

impl ArchivalPartitionHelper {
    /// Reconstruct the archival partitions for `gone_range_id`.
    ///
    /// `successors` are the live ranges overlapping the gone range. Successors
    /// that are the gone range itself carry no lineage and are ignored; an
    /// empty remainder yields no archival partitions.
    pub fn create_archival_partitions(
        gone_range_id: &str,
        successors: &[PartitionKeyRange],
    ) -> Result<Vec<FeedRangeArchivalPartition>> {
        let successors: Vec<&PartitionKeyRange> = successors
            .iter()
            .filter(|range| range.id != gone_range_id)
            .collect();
        if successors.is_empty() {
            return Ok(Vec::new());
        }

        let lineages: Vec<Vec<String>> = successors.iter().map(|range| range.lineage()).collect();
        let (root_index, common_parent) = Self::closest_common_parent(&lineages)?;

        if common_parent != gone_range_id {
            return Err(Error::SplitLineageMismatch {
                gone_range_id: gone_range_id.to_string(),
                common_parent,
            });
        }

        let graph = Self::build_split_graph(&successors, root_index)?;
        debug!(
            gone_range_id,
            nodes = graph.len(),
            successors = successors.len(),
            "Reconstructed split graph"
        );

        Ok(vec![FeedRangeArchivalPartition::new(graph)?])
    }

    /// Find the deepest id shared by every lineage.
    ///
    /// Returns its position in the lineages along with the id. Lineages that
    /// disagree at the root describe a forest of splits, which is rejected.
    pub fn closest_common_parent(lineages: &[Vec<String>]) -> Result<(usize, String)> {
        let shortest = lineages.iter().map(Vec::len).min().unwrap_or(0);

        let mut common = None;
        for index in 0..shortest {
            let candidate = &lineages[0][index];
            if lineages.iter().all(|lineage| &lineage[index] == candidate) {
                common = Some((index, candidate.clone()));
            } else {
                break;
            }
        }

        common.ok_or_else(|| Error::MultiRootSplit {
            lineages: lineages
                .iter()
                .map(|lineage| format!("[{}]", lineage.join(",")))
                .collect::<Vec<_>>()
                .join(" "),
        })
    }

    /// Build one tree rooted at position `root_index` of every lineage.
    ///
    /// Each lineage is walked leaf to root. Missing nodes are created; the
    /// first node that already exists adopts the chain built so far and the
    /// walk stops, so shared ancestors are created once.
    fn build_split_graph(successors: &[&PartitionKeyRange], root_index: usize) -> Result<SplitGraph> {
        let mut nodes: BTreeMap<String, SplitGraphNode> = BTreeMap::new();
        let mut root_id = None;

        for range in successors {
            let lineage = range.lineage();
            let chain = &lineage[root_index..];
            let Some(root) = chain.first() else {
                continue;
            };
            root_id.get_or_insert_with(|| root.clone());

            let mut head: Option<String> = None;
            for (depth, id) in chain.iter().enumerate().rev() {
                if let Some(existing) = nodes.get_mut(id) {
                    if let Some(child) = head.take() {
                        existing.add_child(child);
                    }
                    break;
                }

                // The root has a parent when the gone range was itself a successor
                let mut node = SplitGraphNode::new(id.clone(), depth > 0 || root_index > 0);
                if let Some(child) = head.take() {
                    node.add_child(child);
                } else {
                    node.range = Some((*range).clone());
                }
                nodes.insert(id.clone(), node);
                head = Some(id.clone());
            }
        }

        let root_id = root_id.ok_or_else(|| Error::topology("", "no successor lineages"))?;
        SplitGraph::new(root_id, nodes)
    }
}
