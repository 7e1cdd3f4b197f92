//! Deadlock detection over the allocation graph.
//!
//! Every elementary cycle is enumerated with Johnson's algorithm, one strongly
//! connected component at a time. Each search is rooted at the smallest node
//! of its component, which is then dropped before the component is split
//! again, so every cycle is reported exactly once, rotated to start at its
//! smallest node. Cycles are then kept only if they strictly alternate
//! between resource and process nodes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::graph::AllocationGraph;
use crate::util::types::{NodeId, ProcessId};

/// Result of a deadlock check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockReport {
    /// True when at least one circular wait exists.
    pub has_deadlock: bool,
    /// Accepted cycles, each starting at its smallest node, in ascending order.
    pub cycles: Vec<Vec<NodeId>>,
    /// Every process on an accepted cycle, ascending.
    pub affected_processes: Vec<ProcessId>,
}

impl DeadlockReport {
    /// True if `process` sits on any accepted cycle.
    #[must_use]
    pub fn involves(&self, process: ProcessId) -> bool {
        self.affected_processes.binary_search(&process).is_ok()
    }
}

/// Detect circular waits in `graph`. Never fails; an empty graph yields an
/// empty report.
#[must_use]
pub fn detect_deadlock(graph: &AllocationGraph) -> DeadlockReport {
    let candidates = simple_cycles(graph);
    let mut cycles: Vec<Vec<NodeId>> = candidates
        .into_iter()
        .filter(|cycle| is_alternating(graph, cycle))
        .collect();
    cycles.sort();

    let affected: BTreeSet<ProcessId> = cycles
        .iter()
        .flatten()
        .filter_map(NodeId::as_process)
        .collect();

    tracing::debug!(
        accepted = cycles.len(),
        affected = affected.len(),
        "deadlock scan finished"
    );

    DeadlockReport {
        has_deadlock: !cycles.is_empty(),
        cycles,
        affected_processes: affected.into_iter().collect(),
    }
}

/// Enumerate every elementary directed cycle, each rotated to begin at its
/// smallest node.
///
/// Johnson's algorithm: the search only runs inside non-trivial strongly
/// connected components, and a blocked set keeps it from re-walking paths
/// that already failed to close. Work grows with `(nodes + edges)` times the
/// number of cycles found, so an acyclic graph costs a single linear pass.
#[must_use]
pub fn simple_cycles(graph: &AllocationGraph) -> Vec<Vec<NodeId>> {
    let mut cycles = Vec::new();
    let nodes: BTreeSet<NodeId> = graph.nodes().map(|(id, _)| *id).collect();

    for id in &nodes {
        if graph.has_edge(id, id) {
            cycles.push(vec![*id]);
        }
    }

    let mut components = strongly_connected(graph, &nodes);
    while let Some(mut component) = components.pop() {
        let Some(&start) = component.first() else {
            continue;
        };
        let mut search = CircuitSearch::new(graph, &component, start);
        search.circuit(start, &mut cycles);

        component.remove(&start);
        components.extend(strongly_connected(graph, &component));
    }
    cycles
}

/// Johnson's circuit search rooted at the smallest node of one component.
struct CircuitSearch<'g> {
    graph: &'g AllocationGraph,
    component: &'g BTreeSet<NodeId>,
    start: NodeId,
    path: Vec<NodeId>,
    blocked: BTreeSet<NodeId>,
    blocked_by: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl<'g> CircuitSearch<'g> {
    const fn new(graph: &'g AllocationGraph, component: &'g BTreeSet<NodeId>, start: NodeId) -> Self {
        Self {
            graph,
            component,
            start,
            path: Vec::new(),
            blocked: BTreeSet::new(),
            blocked_by: BTreeMap::new(),
        }
    }

    fn successors(&self, node: NodeId) -> Vec<NodeId> {
        self.graph
            .successors(&node)
            .filter(|next| **next != node && self.component.contains(next))
            .copied()
            .collect()
    }

    /// Returns true if some path from `node` closed back to the start.
    fn circuit(&mut self, node: NodeId, cycles: &mut Vec<Vec<NodeId>>) -> bool {
        let mut closed = false;
        self.path.push(node);
        self.blocked.insert(node);

        let successors = self.successors(node);
        for &next in &successors {
            if next == self.start {
                cycles.push(self.path.clone());
                closed = true;
            } else if !self.blocked.contains(&next) && self.circuit(next, cycles) {
                closed = true;
            }
        }

        if closed {
            self.unblock(node);
        } else {
            for next in successors {
                self.blocked_by.entry(next).or_default().insert(node);
            }
        }
        self.path.pop();
        closed
    }

    fn unblock(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if self.blocked.remove(&current) {
                if let Some(waiting) = self.blocked_by.remove(&current) {
                    pending.extend(waiting);
                }
            }
        }
    }
}

/// Strongly connected components of the subgraph induced by `within` that
/// contain at least two nodes. Iterative Tarjan, so deep chains cannot
/// exhaust the stack.
fn strongly_connected(graph: &AllocationGraph, within: &BTreeSet<NodeId>) -> Vec<BTreeSet<NodeId>> {
    let mut tarjan = Tarjan::default();
    for &root in within {
        if !tarjan.index.contains_key(&root) {
            tarjan.run(graph, within, root);
        }
    }
    tarjan.components
}

#[derive(Default)]
struct Tarjan {
    next_index: usize,
    index: BTreeMap<NodeId, usize>,
    lowlink: BTreeMap<NodeId, usize>,
    stack: Vec<NodeId>,
    on_stack: BTreeSet<NodeId>,
    components: Vec<BTreeSet<NodeId>>,
}

impl Tarjan {
    fn open(
        &mut self,
        graph: &AllocationGraph,
        within: &BTreeSet<NodeId>,
        node: NodeId,
        frames: &mut Vec<(NodeId, Vec<NodeId>)>,
    ) {
        self.index.insert(node, self.next_index);
        self.lowlink.insert(node, self.next_index);
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
        let successors: Vec<NodeId> = graph
            .successors(&node)
            .filter(|next| within.contains(next))
            .copied()
            .collect();
        frames.push((node, successors));
    }

    fn lower(&mut self, node: NodeId, candidate: usize) {
        if let Some(low) = self.lowlink.get_mut(&node) {
            *low = (*low).min(candidate);
        }
    }

    fn run(&mut self, graph: &AllocationGraph, within: &BTreeSet<NodeId>, root: NodeId) {
        let mut frames = Vec::new();
        self.open(graph, within, root, &mut frames);

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some(next) = frame.1.pop() {
                let seen = self.index.get(&next).copied();
                match seen {
                    None => self.open(graph, within, next, &mut frames),
                    Some(next_index) if self.on_stack.contains(&next) => {
                        self.lower(node, next_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            let low = self.lowlink.get(&node).copied().unwrap_or(usize::MAX);
            if let Some((parent, _)) = frames.last() {
                let parent = *parent;
                self.lower(parent, low);
            }
            if self.index.get(&node) == Some(&low) {
                let mut component = BTreeSet::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(&member);
                    component.insert(member);
                    if member == node {
                        break;
                    }
                }
                if component.len() > 1 {
                    self.components.push(component);
                }
            }
        }
    }
}

/// A cycle is a genuine circular wait only if consecutive nodes (wrapping
/// around) have known and different kinds.
fn is_alternating(graph: &AllocationGraph, cycle: &[NodeId]) -> bool {
    if cycle.len() < 2 {
        return false;
    }
    cycle
        .iter()
        .zip(cycle.iter().cycle().skip(1))
        .all(|(a, b)| match (graph.node_kind(a), graph.node_kind(b)) {
            (Some(ka), Some(kb)) => ka != kb,
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::EdgeKind;
    use crate::util::types::ResourceId;

    fn process(graph: &mut AllocationGraph, name: &str) -> NodeId {
        let id = NodeId::from(ProcessId::new_v4());
        graph.add_node(id, name);
        id
    }

    fn resource(graph: &mut AllocationGraph, name: &str) -> NodeId {
        let id = NodeId::from(ResourceId::new_v4());
        graph.add_node(id, name);
        id
    }

    #[test]
    fn test_empty_graph_has_no_deadlock() {
        let report = detect_deadlock(&AllocationGraph::new());
        assert!(!report.has_deadlock);
        assert!(report.cycles.is_empty());
        assert!(report.affected_processes.is_empty());
    }

    #[test]
    fn test_two_process_circular_wait() {
        let mut graph = AllocationGraph::new();
        let p1 = process(&mut graph, "p1");
        let p2 = process(&mut graph, "p2");
        let r1 = resource(&mut graph, "r1");
        let r2 = resource(&mut graph, "r2");
        graph.set_edge(r1, p1, EdgeKind::Allocation, 1);
        graph.set_edge(r2, p2, EdgeKind::Allocation, 1);
        graph.set_edge(p1, r2, EdgeKind::Request, 1);
        graph.set_edge(p2, r1, EdgeKind::Request, 1);

        let report = detect_deadlock(&graph);
        assert!(report.has_deadlock);
        assert_eq!(report.cycles.len(), 1);
        let members: BTreeSet<NodeId> = report.cycles[0].iter().copied().collect();
        assert_eq!(members, BTreeSet::from([p1, p2, r1, r2]));
        assert_eq!(report.affected_processes.len(), 2);
    }

    #[test]
    fn test_each_cycle_reported_once_from_smallest_node() {
        let mut graph = AllocationGraph::new();
        let p = process(&mut graph, "p");
        let r = resource(&mut graph, "r");
        graph.set_edge(r, p, EdgeKind::Allocation, 1);
        graph.set_edge(p, r, EdgeKind::Request, 1);

        let cycles = simple_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        // Resources order before processes.
        assert_eq!(cycles[0], vec![r, p]);
    }

    #[test]
    fn test_overlapping_cycles_are_all_found() {
        // r1 -> p1 -> r2 -> p2 -> r1 and r1 -> p1 -> r3 -> p2 -> r1
        let mut graph = AllocationGraph::new();
        let p1 = process(&mut graph, "p1");
        let p2 = process(&mut graph, "p2");
        let r1 = resource(&mut graph, "r1");
        let r2 = resource(&mut graph, "r2");
        let r3 = resource(&mut graph, "r3");
        graph.set_edge(r1, p1, EdgeKind::Allocation, 1);
        graph.set_edge(p1, r2, EdgeKind::Request, 1);
        graph.set_edge(p1, r3, EdgeKind::Request, 1);
        graph.set_edge(r2, p2, EdgeKind::Allocation, 1);
        graph.set_edge(r3, p2, EdgeKind::Allocation, 1);
        graph.set_edge(p2, r1, EdgeKind::Request, 1);

        let report = detect_deadlock(&graph);
        assert_eq!(report.cycles.len(), 2);
        assert!(report.involves(p1.as_process().unwrap()));
        assert!(report.involves(p2.as_process().unwrap()));
    }

    #[test]
    fn test_same_kind_cycle_is_rejected() {
        let mut graph = AllocationGraph::new();
        let p1 = process(&mut graph, "p1");
        let p2 = process(&mut graph, "p2");
        graph.set_edge(p1, p2, EdgeKind::Request, 1);
        graph.set_edge(p2, p1, EdgeKind::Request, 1);

        assert_eq!(simple_cycles(&graph).len(), 1);
        assert!(!detect_deadlock(&graph).has_deadlock);
    }

    #[test]
    fn test_edge_to_unknown_node_is_ignored() {
        let mut graph = AllocationGraph::new();
        let p = process(&mut graph, "p");
        let ghost = NodeId::from(ResourceId::new_v4());
        graph.set_edge(p, ghost, EdgeKind::Request, 1);
        graph.set_edge(ghost, p, EdgeKind::Allocation, 1);

        assert!(!detect_deadlock(&graph).has_deadlock);
    }

    #[test]
    fn test_converging_requests_are_not_a_cycle() {
        let mut graph = AllocationGraph::new();
        let p1 = process(&mut graph, "p1");
        let p2 = process(&mut graph, "p2");
        let r = resource(&mut graph, "r");
        graph.set_edge(p1, r, EdgeKind::Request, 1);
        graph.set_edge(p2, r, EdgeKind::Request, 1);

        assert!(simple_cycles(&graph).is_empty());
    }

    #[test]
    fn test_layered_acyclic_graph_is_cheap() {
        // Every process of a layer holds every resource of that layer and
        // waits on every resource of the next one. Plenty of paths, no cycle.
        const WIDTH: usize = 6;
        const LAYERS: usize = 20;
        let mut graph = AllocationGraph::new();
        let layers: Vec<(Vec<NodeId>, Vec<NodeId>)> = (0..LAYERS)
            .map(|layer| {
                let rs: Vec<NodeId> = (0..WIDTH)
                    .map(|i| resource(&mut graph, &format!("r{layer}.{i}")))
                    .collect();
                let ps: Vec<NodeId> = (0..WIDTH)
                    .map(|i| process(&mut graph, &format!("p{layer}.{i}")))
                    .collect();
                (rs, ps)
            })
            .collect();
        for (layer, (rs, ps)) in layers.iter().enumerate() {
            for r in rs {
                for p in ps {
                    graph.set_edge(*r, *p, EdgeKind::Allocation, 1);
                }
            }
            if let Some((next_rs, _)) = layers.get(layer + 1) {
                for p in ps {
                    for r in next_rs {
                        graph.set_edge(*p, *r, EdgeKind::Request, 1);
                    }
                }
            }
        }

        let started = std::time::Instant::now();
        let report = detect_deadlock(&graph);
        assert!(!report.has_deadlock);
        assert!(simple_cycles(&graph).is_empty());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_dense_contention_enumerates_every_cycle_once() {
        // Three resources each held by and requested by all three processes.
        // Cycles through k resources and k processes: C(3,k)^2 * k! * (k-1)!
        // which is 9 + 18 + 12.
        let mut graph = AllocationGraph::new();
        let rs: Vec<NodeId> = (0..3).map(|i| resource(&mut graph, &format!("r{i}"))).collect();
        let ps: Vec<NodeId> = (0..3).map(|i| process(&mut graph, &format!("p{i}"))).collect();
        for r in &rs {
            for p in &ps {
                graph.set_edge(*r, *p, EdgeKind::Allocation, 1);
                graph.set_edge(*p, *r, EdgeKind::Request, 1);
            }
        }

        let cycles = simple_cycles(&graph);
        assert_eq!(cycles.len(), 39);
        let unique: BTreeSet<&Vec<NodeId>> = cycles.iter().collect();
        assert_eq!(unique.len(), 39);
        for cycle in &cycles {
            assert_eq!(cycle.iter().min(), cycle.first());
        }
        assert_eq!(detect_deadlock(&graph).affected_processes.len(), 3);
    }

    #[test]
    fn test_long_ring_is_one_cycle() {
        let mut graph = AllocationGraph::new();
        let rs: Vec<NodeId> = (0..200).map(|i| resource(&mut graph, &format!("r{i}"))).collect();
        let ps: Vec<NodeId> = (0..200).map(|i| process(&mut graph, &format!("p{i}"))).collect();
        for i in 0..200 {
            graph.set_edge(rs[i], ps[i], EdgeKind::Allocation, 1);
            graph.set_edge(ps[i], rs[(i + 1) % 200], EdgeKind::Request, 1);
        }

        let report = detect_deadlock(&graph);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].len(), 400);
        assert_eq!(report.affected_processes.len(), 200);
    }
}
