//! Split graph arena
//!
//! Nodes refer to their children by range id, so several leaf lineages can
//! share an interior ancestor without shared ownership.

use crate::range::{compare_range_ids, FeedRangeEpk, PartitionKeyRange};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One node of a reconstructed split tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitGraphNode {
    /// Range id of this node
    pub range_id: String,
    /// Child range ids, ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Whether this node descends from another archived range
    #[serde(default)]
    pub has_parent: bool,
    /// Descriptor of a live leaf range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<PartitionKeyRange>,
}

impl SplitGraphNode {
    /// Create a node with no children
    pub fn new(range_id: impl Into<String>, has_parent: bool) -> Self {
        Self {
            range_id: range_id.into(),
            children: Vec::new(),
            has_parent,
            range: None,
        }
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Insert a child id, keeping children sorted and unique
    pub fn add_child(&mut self, child: impl Into<String>) {
        let child = child.into();
        if let Err(position) = self
            .children
            .binary_search_by(|existing| compare_range_ids(existing, &child))
        {
            self.children.insert(position, child);
        }
    }
}

/// A split tree stored as an arena keyed by range id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SplitGraphRepr")]
pub struct SplitGraph {
    root: String,
    nodes: BTreeMap<String, SplitGraphNode>,
}

#[derive(Deserialize)]
struct SplitGraphRepr {
    root: String,
    nodes: BTreeMap<String, SplitGraphNode>,
}

impl TryFrom<SplitGraphRepr> for SplitGraph {
    type Error = String;

    fn try_from(repr: SplitGraphRepr) -> Result<Self, Self::Error> {
        let graph = SplitGraph {
            root: repr.root,
            nodes: repr.nodes,
        };
        graph.check()?;
        Ok(graph)
    }
}

impl SplitGraph {
    /// Assemble a graph from its root id and node arena.
    ///
    /// Fails when the arena is not a tree rooted at `root` or a leaf has no
    /// range descriptor.
    pub fn new(
        root: impl Into<String>,
        nodes: BTreeMap<String, SplitGraphNode>,
    ) -> crate::error::Result<Self> {
        let graph = SplitGraph {
            root: root.into(),
            nodes,
        };
        graph
            .check()
            .map_err(|message| crate::error::Error::topology(graph.root.clone(), message))?;
        Ok(graph)
    }

    fn check(&self) -> Result<(), String> {
        if !self.nodes.contains_key(&self.root) {
            return Err(format!("split graph root {} has no node", self.root));
        }

        let mut visited = HashSet::new();
        let mut pending = vec![self.root.as_str()];
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                return Err(format!("split graph node {id} is reachable twice"));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| format!("split graph references missing node {id}"))?;
            if node.range_id != id {
                return Err(format!(
                    "split graph node keyed {id} carries range id {}",
                    node.range_id
                ));
            }
            if node.is_leaf() && node.range.is_none() {
                return Err(format!("split graph leaf {id} has no range descriptor"));
            }
            pending.extend(node.children.iter().map(String::as_str));
        }

        if visited.len() != self.nodes.len() {
            return Err(format!(
                "split graph has {} nodes unreachable from root {}",
                self.nodes.len() - visited.len(),
                self.root
            ));
        }
        Ok(())
    }

    /// Root range id
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Root node
    pub fn root(&self) -> Option<&SplitGraphNode> {
        self.nodes.get(&self.root)
    }

    /// Node by range id
    pub fn node(&self, range_id: &str) -> Option<&SplitGraphNode> {
        self.nodes.get(range_id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of the root, in id order
    pub fn root_children(&self) -> Vec<&SplitGraphNode> {
        self.root()
            .map(|root| {
                root.children
                    .iter()
                    .filter_map(|id| self.nodes.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy of the tree below `range_id`, rooted there.
    ///
    /// The new root keeps its `has_parent` flag, so a subtree cut from a
    /// larger archive remembers that it has an archival ancestor.
    pub fn subtree(&self, range_id: &str) -> Option<SplitGraph> {
        self.nodes.get(range_id)?;

        let mut nodes = BTreeMap::new();
        let mut pending = vec![range_id];
        while let Some(id) = pending.pop() {
            let node = self.nodes.get(id)?;
            pending.extend(node.children.iter().map(String::as_str));
            nodes.insert(id.to_string(), node.clone());
        }

        Some(SplitGraph {
            root: range_id.to_string(),
            nodes,
        })
    }

    /// The leaf reached by always following the smallest child id.
    ///
    /// On a split the smallest child inherits its parent's archive, so this
    /// leaf is the live range the archive is read through.
    pub fn routing_leaf(&self) -> Option<&SplitGraphNode> {
        let mut node = self.root()?;
        while let Some(first) = node.children.first() {
            node = self.nodes.get(first)?;
        }
        Some(node)
    }

    /// Leaf descriptors in key order
    pub fn leaf_ranges(&self) -> Vec<&PartitionKeyRange> {
        let mut leaves: Vec<&PartitionKeyRange> = self
            .nodes
            .values()
            .filter(|node| node.is_leaf())
            .filter_map(|node| node.range.as_ref())
            .collect();
        leaves.sort_by(|a, b| a.min.cmp(&b.min));
        leaves
    }

    /// Key space covered by the leaves
    pub fn bounds(&self) -> Option<FeedRangeEpk> {
        let leaves = self.leaf_ranges();
        let min = leaves.iter().map(|range| range.min.as_str()).min()?;
        let max = leaves.iter().map(|range| range.max.as_str()).max()?;
        Some(FeedRangeEpk::new(min, max))
    }
}
