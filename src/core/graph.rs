//! Directed allocation graph.
//!
//! Nodes are resources and processes. An `allocation` edge runs
//! resource → process and carries the units held; a `request` edge runs
//! process → resource and carries the units pending. The graph is a
//! materialized view of the entity maps: the engine updates both in the same
//! critical section and never reads the graph as a source of truth for
//! accounting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::types::{NodeId, NodeKind};

/// Kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Resource → process: units held.
    Allocation,
    /// Process → resource: units pending.
    Request,
}

/// Edge payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Relation kind.
    pub kind: EdgeKind,
    /// Units held or pending on this edge.
    pub units: u32,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Resource or process.
    pub kind: NodeKind,
    /// Display name of the underlying entity.
    pub name: String,
}

/// Adjacency-map digraph keyed by [`NodeId`].
///
/// `BTreeMap` keeps iteration order stable, so every traversal over the graph
/// is reproducible for a given state.
#[derive(Debug, Clone, Default)]
pub struct AllocationGraph {
    nodes: BTreeMap<NodeId, NodeData>,
    out_edges: BTreeMap<NodeId, BTreeMap<NodeId, EdgeData>>,
}

impl AllocationGraph {
    /// Create an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            out_edges: BTreeMap::new(),
        }
    }

    /// Insert a node, replacing its attributes if it already exists.
    pub fn add_node(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes.insert(
            id,
            NodeData {
                kind: id.kind(),
                name: name.into(),
            },
        );
        self.out_edges.entry(id).or_default();
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        self.out_edges.remove(&id);
        for targets in self.out_edges.values_mut() {
            targets.remove(&id);
        }
    }

    /// Insert or overwrite the edge `from → to`.
    pub fn set_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind, units: u32) {
        self.out_edges
            .entry(from)
            .or_default()
            .insert(to, EdgeData { kind, units });
    }

    /// Remove the edge `from → to` if present.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Option<EdgeData> {
        self.out_edges.get_mut(&from)?.remove(&to)
    }

    /// Node attributes.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Recorded kind of a node, `None` if the node is unknown.
    #[must_use]
    pub fn node_kind(&self, id: &NodeId) -> Option<NodeKind> {
        self.nodes.get(id).map(|data| data.kind)
    }

    /// True if the node exists.
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Edge payload for `from → to`.
    #[must_use]
    pub fn edge(&self, from: &NodeId, to: &NodeId) -> Option<&EdgeData> {
        self.out_edges.get(from)?.get(to)
    }

    /// True if `from → to` exists.
    #[must_use]
    pub fn has_edge(&self, from: &NodeId, to: &NodeId) -> bool {
        self.edge(from, to).is_some()
    }

    /// Nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeData)> {
        self.nodes.iter()
    }

    /// Direct successors of a node in ascending order.
    pub fn successors(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
        self.out_edges
            .get(id)
            .into_iter()
            .flat_map(BTreeMap::keys)
    }

    /// Every edge as `(from, to, data)`, ordered by `from` then `to`.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId, &EdgeData)> {
        self.out_edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |(to, data)| (from, to, data)))
    }

    /// True if any edge starts or ends at `id`.
    #[must_use]
    pub fn touches(&self, id: &NodeId) -> bool {
        self.out_edges.get(id).is_some_and(|targets| !targets.is_empty())
            || self.out_edges.values().any(|targets| targets.contains_key(id))
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(BTreeMap::len).sum()
    }

    /// True when the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.out_edges.clear();
    }
}
