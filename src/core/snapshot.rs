//! Renderer-neutral view of the allocation graph.
//!
//! Built from the graph model with labels and status taken from the entity
//! store. Any node whose entity record is missing is left out rather than
//! reported half-filled.

use serde::{Deserialize, Serialize};

use crate::core::deadlock::DeadlockReport;
use crate::core::engine::EngineState;
use crate::core::graph::EdgeKind;
use crate::util::types::{NodeId, NodeKind};

/// Display status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Resource with every unit free.
    Available,
    /// Resource with some units held and some free.
    PartiallyAllocated,
    /// Resource with no free units.
    FullyAllocated,
    /// Process holding nothing and waiting on nothing.
    Idle,
    /// Process holding units and waiting on nothing.
    Holding,
    /// Process with at least one pending request.
    Waiting,
    /// Process on a deadlock cycle.
    Deadlocked,
}

/// Node entry of a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Entity identifier.
    pub id: NodeId,
    /// Resource or process.
    pub kind: NodeKind,
    /// Short label; resources show `name (available/total)`.
    pub label: String,
    /// Current status.
    pub status: NodeStatus,
    /// Multi-line hover text.
    pub title: String,
}

/// Edge entry of a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
    /// Allocation or request.
    pub kind: EdgeKind,
    /// Units held or pending.
    pub units: u32,
    /// Hover text such as `2 units allocated`.
    pub title: String,
}

/// Node and edge lists suitable for any renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes in id order: resources first, then processes.
    pub nodes: Vec<SnapshotNode>,
    /// Edges ordered by source then target.
    pub edges: Vec<SnapshotEdge>,
}

impl GraphSnapshot {
    /// Node entry for `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SnapshotNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

pub(crate) fn build_snapshot(state: &EngineState, deadlock: &DeadlockReport) -> GraphSnapshot {
    let nodes = state
        .graph
        .nodes()
        .filter_map(|(id, _)| match *id {
            NodeId::Resource(resource_id) => {
                let resource = state.resources.get(&resource_id)?;
                let status = if !resource.is_allocated() {
                    NodeStatus::Available
                } else if resource.available_units() == 0 {
                    NodeStatus::FullyAllocated
                } else {
                    NodeStatus::PartiallyAllocated
                };
                Some(SnapshotNode {
                    id: *id,
                    kind: NodeKind::Resource,
                    label: format!(
                        "{} ({}/{})",
                        resource.name(),
                        resource.available_units(),
                        resource.total_units()
                    ),
                    status,
                    title: format!(
                        "Resource: {}\nAvailable: {}/{} units\nAllocated: {} units",
                        resource.name(),
                        resource.available_units(),
                        resource.total_units(),
                        resource.allocated_units()
                    ),
                })
            }
            NodeId::Process(process_id) => {
                let process = state.processes.get(&process_id)?;
                let status = if deadlock.involves(process_id) {
                    NodeStatus::Deadlocked
                } else if process.is_waiting() {
                    NodeStatus::Waiting
                } else if process.is_holding() {
                    NodeStatus::Holding
                } else {
                    NodeStatus::Idle
                };
                Some(SnapshotNode {
                    id: *id,
                    kind: NodeKind::Process,
                    label: process.name().to_owned(),
                    status,
                    title: format!(
                        "Process: {}\nAllocated Resources: {}\nRequested Resources: {}",
                        process.name(),
                        process.allocated_resources().len(),
                        process.requested_resources().len()
                    ),
                })
            }
        })
        .collect();

    let edges = state
        .graph
        .edges()
        .map(|(from, to, data)| {
            let verb = match data.kind {
                EdgeKind::Allocation => "allocated",
                EdgeKind::Request => "requested",
            };
            let plural = if data.units == 1 { "" } else { "s" };
            SnapshotEdge {
                from: *from,
                to: *to,
                kind: data.kind,
                units: data.units,
                title: format!("{} unit{plural} {verb}", data.units),
            }
        })
        .collect();

    GraphSnapshot { nodes, edges }
}
