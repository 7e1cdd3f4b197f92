//! Allocation graph engine.
//!
//! [`AllocationEngine`] owns every resource and process record together with
//! the graph view and the history log. Each public mutation takes the write
//! lock for its full duration, validates everything it needs before touching
//! state, then applies the change to all three structures. A failed call
//! therefore leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::core::analytics::{RecommendationReport, UsageAnalyzer, UsageReport};
use crate::core::deadlock::{detect_deadlock, DeadlockReport};
use crate::core::error::AllocationError;
use crate::core::graph::{AllocationGraph, EdgeKind};
use crate::core::history::{HistoryEntry, HistoryKind, HistoryLog};
use crate::core::model::{Process, Resource};
use crate::core::snapshot::{build_snapshot, GraphSnapshot};
use crate::util::clock::{Clock, SystemClock};
use crate::util::types::{NodeId, ProcessId, ResourceId};

/// Entity store, graph model and history log.
///
/// Only reachable through [`AllocationEngine`], which serializes access.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) resources: BTreeMap<ResourceId, Resource>,
    pub(crate) processes: BTreeMap<ProcessId, Process>,
    pub(crate) graph: AllocationGraph,
    pub(crate) history: HistoryLog,
}

impl EngineState {
    fn add_resource(
        &mut self,
        name: String,
        total_units: u32,
    ) -> Result<ResourceId, AllocationError> {
        if total_units == 0 {
            return Err(AllocationError::InvalidArgument(
                "resource units must be greater than 0".into(),
            ));
        }
        let id = ResourceId::new_v4();
        self.graph.add_node(id.into(), name.clone());
        self.resources.insert(id, Resource::new(id, name, total_units));
        tracing::info!(resource = %id, total_units, "resource added");
        Ok(id)
    }

    fn add_process(&mut self, name: String, now_ms: u128) -> ProcessId {
        let id = ProcessId::new_v4();
        self.graph.add_node(id.into(), name.clone());
        self.processes.insert(id, Process::new(id, name, now_ms));
        tracing::info!(process = %id, "process added");
        id
    }

    fn allocate(
        &mut self,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
        now_ms: u128,
    ) -> Result<(), AllocationError> {
        if units == 0 {
            return Err(AllocationError::InvalidArgument(
                "units must be greater than 0".into(),
            ));
        }
        let process = self
            .processes
            .get_mut(&process_id)
            .ok_or(AllocationError::ProcessNotFound(process_id))?;
        let resource = self
            .resources
            .get_mut(&resource_id)
            .ok_or(AllocationError::ResourceNotFound(resource_id))?;
        if units > resource.available_units {
            return Err(AllocationError::InsufficientUnits {
                resource: resource_id,
                requested: units,
                available: resource.available_units,
            });
        }

        resource.hold(process_id, units);
        let held = process.allocated_resources.entry(resource_id).or_insert(0);
        *held += units;
        self.graph.set_edge(
            resource_id.into(),
            process_id.into(),
            EdgeKind::Allocation,
            *held,
        );
        self.history.record(HistoryEntry::new(
            now_ms,
            HistoryKind::Allocation,
            process_id,
            resource_id,
            units,
        ));
        tracing::info!(
            process = %process_id,
            resource = %resource_id,
            units,
            available = resource.available_units,
            "units allocated"
        );
        Ok(())
    }

    fn request(
        &mut self,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
        now_ms: u128,
    ) -> Result<(), AllocationError> {
        if units == 0 {
            return Err(AllocationError::InvalidArgument(
                "units must be greater than 0".into(),
            ));
        }
        let process = self
            .processes
            .get_mut(&process_id)
            .ok_or(AllocationError::ProcessNotFound(process_id))?;
        let resource = self
            .resources
            .get_mut(&resource_id)
            .ok_or(AllocationError::ResourceNotFound(resource_id))?;
        let pending = resource.pending_after(process_id, units).ok_or_else(|| {
            AllocationError::InvalidArgument("pending units overflow".into())
        })?;

        resource.set_request(process_id, pending);
        process.requested_resources.insert(resource_id, pending);
        self.graph.set_edge(
            process_id.into(),
            resource_id.into(),
            EdgeKind::Request,
            pending,
        );
        self.history.record(HistoryEntry::new(
            now_ms,
            HistoryKind::Request,
            process_id,
            resource_id,
            units,
        ));
        tracing::info!(
            process = %process_id,
            resource = %resource_id,
            units,
            pending,
            "units requested"
        );
        Ok(())
    }

    fn release(
        &mut self,
        process_id: ProcessId,
        resource_id: ResourceId,
        now_ms: u128,
    ) -> Result<u32, AllocationError> {
        let process = self
            .processes
            .get_mut(&process_id)
            .ok_or(AllocationError::ProcessNotFound(process_id))?;
        let resource = self
            .resources
            .get_mut(&resource_id)
            .ok_or(AllocationError::ResourceNotFound(resource_id))?;
        let Some(units) = process.allocated_resources.remove(&resource_id) else {
            return Err(AllocationError::NotAllocated {
                process: process_id,
                resource: resource_id,
            });
        };

        let returned = resource.release_holder(process_id);
        debug_assert_eq!(returned, Some(units));
        self.graph
            .remove_edge(resource_id.into(), process_id.into());
        self.history.record(HistoryEntry::new(
            now_ms,
            HistoryKind::Release,
            process_id,
            resource_id,
            units,
        ));
        tracing::info!(
            process = %process_id,
            resource = %resource_id,
            units,
            available = resource.available_units,
            "units released"
        );
        Ok(units)
    }

    fn cancel_request(
        &mut self,
        process_id: ProcessId,
        resource_id: ResourceId,
        now_ms: u128,
    ) -> Result<u32, AllocationError> {
        let process = self
            .processes
            .get_mut(&process_id)
            .ok_or(AllocationError::ProcessNotFound(process_id))?;
        let resource = self
            .resources
            .get_mut(&resource_id)
            .ok_or(AllocationError::ResourceNotFound(resource_id))?;
        let Some(units) = process.requested_resources.remove(&resource_id) else {
            return Err(AllocationError::NoPendingRequest {
                process: process_id,
                resource: resource_id,
            });
        };

        let dropped = resource.drop_request(process_id);
        debug_assert_eq!(dropped, Some(units));
        self.graph
            .remove_edge(process_id.into(), resource_id.into());
        self.history.record(HistoryEntry::new(
            now_ms,
            HistoryKind::CancelRequest,
            process_id,
            resource_id,
            units,
        ));
        tracing::info!(process = %process_id, resource = %resource_id, units, "request cancelled");
        Ok(units)
    }

    fn remove_process(
        &mut self,
        process_id: ProcessId,
        now_ms: u128,
    ) -> Result<(), AllocationError> {
        let process = self
            .processes
            .get(&process_id)
            .ok_or(AllocationError::ProcessNotFound(process_id))?;
        let held: Vec<ResourceId> = process.allocated_resources.keys().copied().collect();
        let pending: Vec<ResourceId> = process.requested_resources.keys().copied().collect();

        for resource_id in held {
            self.release(process_id, resource_id, now_ms)?;
        }
        for resource_id in pending {
            self.cancel_request(process_id, resource_id, now_ms)?;
        }

        self.graph.remove_node(process_id.into());
        self.processes.remove(&process_id);
        tracing::info!(process = %process_id, "process removed");
        Ok(())
    }

    fn delete_resource(
        &mut self,
        resource_id: ResourceId,
        now_ms: u128,
    ) -> Result<(), AllocationError> {
        let resource = self
            .resources
            .get(&resource_id)
            .ok_or(AllocationError::ResourceNotFound(resource_id))?;
        if resource.is_allocated() {
            return Err(AllocationError::ResourceInUse {
                resource: resource_id,
                allocated: resource.total_units - resource.available_units,
                total: resource.total_units,
            });
        }

        // Pending requests do not block deletion; they are withdrawn with it.
        let waiting: Vec<ProcessId> = resource.requested_by.keys().copied().collect();
        for process_id in waiting {
            self.cancel_request(process_id, resource_id, now_ms)?;
        }

        self.graph.remove_node(resource_id.into());
        self.resources.remove(&resource_id);
        tracing::info!(resource = %resource_id, "resource deleted");
        Ok(())
    }

    fn clear(&mut self) {
        self.resources.clear();
        self.processes.clear();
        self.graph.clear();
        self.history.clear();
    }

    /// Every way the entity maps and the graph disagree, plus any entry or
    /// edge left at zero units. Empty when healthy.
    pub(crate) fn consistency_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (id, resource) in &self.resources {
            let held = resource.allocated_units();
            if u64::from(resource.available_units) + u64::from(held)
                != u64::from(resource.total_units)
            {
                violations.push(format!(
                    "resource {id}: available {} + allocated {held} != total {}",
                    resource.available_units, resource.total_units
                ));
            }
            for (process_id, units) in &resource.allocated_to {
                if *units == 0 {
                    violations.push(format!("allocation {id} -> {process_id} holds 0 units"));
                }
                let mirrored = self
                    .processes
                    .get(process_id)
                    .and_then(|p| p.allocated_resources.get(id));
                if mirrored != Some(units) {
                    violations.push(format!(
                        "allocation {id} -> {process_id} not mirrored on process"
                    ));
                }
                let edge = self.graph.edge(&NodeId::from(*id), &NodeId::from(*process_id));
                if edge.map(|e| (e.kind, e.units)) != Some((EdgeKind::Allocation, *units)) {
                    violations.push(format!("allocation edge {id} -> {process_id} out of sync"));
                }
            }
            for (process_id, units) in &resource.requested_by {
                if *units == 0 {
                    violations.push(format!("request {process_id} -> {id} pends 0 units"));
                }
                let mirrored = self
                    .processes
                    .get(process_id)
                    .and_then(|p| p.requested_resources.get(id));
                if mirrored != Some(units) {
                    violations.push(format!(
                        "request {process_id} -> {id} not mirrored on process"
                    ));
                }
                let edge = self.graph.edge(&NodeId::from(*process_id), &NodeId::from(*id));
                if edge.map(|e| (e.kind, e.units)) != Some((EdgeKind::Request, *units)) {
                    violations.push(format!("request edge {process_id} -> {id} out of sync"));
                }
            }
        }

        for (process_id, process) in &self.processes {
            let zero_entries = process
                .allocated_resources
                .values()
                .chain(process.requested_resources.values())
                .filter(|units| **units == 0)
                .count();
            if zero_entries > 0 {
                violations.push(format!(
                    "process {process_id} has {zero_entries} zero-unit entries"
                ));
            }
            for resource_id in process.allocated_resources.keys() {
                let known = self
                    .resources
                    .get(resource_id)
                    .is_some_and(|r| r.allocated_to.contains_key(process_id));
                if !known {
                    violations.push(format!(
                        "process {process_id} holds unknown allocation on {resource_id}"
                    ));
                }
            }
            for resource_id in process.requested_resources.keys() {
                let known = self
                    .resources
                    .get(resource_id)
                    .is_some_and(|r| r.requested_by.contains_key(process_id));
                if !known {
                    violations.push(format!(
                        "process {process_id} waits on unknown request for {resource_id}"
                    ));
                }
            }
        }

        for (from, to, data) in self.graph.edges() {
            if data.units == 0 {
                violations.push(format!("edge {from} -> {to} carries 0 units"));
            }
            let backed = match (from, to, data.kind) {
                (NodeId::Resource(r), NodeId::Process(p), EdgeKind::Allocation) => self
                    .resources
                    .get(r)
                    .is_some_and(|res| res.allocated_to.contains_key(p)),
                (NodeId::Process(p), NodeId::Resource(r), EdgeKind::Request) => self
                    .resources
                    .get(r)
                    .is_some_and(|res| res.requested_by.contains_key(p)),
                _ => false,
            };
            if !backed {
                violations.push(format!("edge {from} -> {to} has no backing entry"));
            }
        }

        let entities = self.resources.len() + self.processes.len();
        if self.graph.node_count() != entities {
            violations.push(format!(
                "graph has {} nodes for {entities} entities",
                self.graph.node_count()
            ));
        }

        violations
    }
}

/// Thread-safe allocation graph engine.
///
/// Mutations hold the write lock; queries share the read lock. Share the
/// engine between collaborators with `Arc<AllocationEngine>`.
pub struct AllocationEngine {
    state: RwLock<EngineState>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AllocationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("AllocationEngine")
            .field("resources", &state.resources.len())
            .field("processes", &state.processes.len())
            .field("history", &state.history.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn log_rejection<T>(op: &'static str, result: Result<T, AllocationError>) -> Result<T, AllocationError> {
    if let Err(err) = &result {
        tracing::warn!(op, kind = err.kind(), "{err}");
    }
    result
}

impl AllocationEngine {
    /// Create an empty engine with the default configuration and wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(EngineConfig::default(), Arc::new(SystemClock))
    }

    /// Create an empty engine from an already validated configuration and a
    /// clock. Prefer [`crate::builders::EngineBuilder`], which validates.
    #[must_use]
    pub fn with_parts(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            clock,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Mutations ──────────────────────────────────────────────

    /// Create a resource with `total_units` free units.
    ///
    /// # Errors
    /// `InvalidArgument` if `total_units` is zero.
    pub fn add_resource(
        &self,
        name: impl Into<String>,
        total_units: u32,
    ) -> Result<ResourceId, AllocationError> {
        let mut state = self.state.write();
        log_rejection("add_resource", state.add_resource(name.into(), total_units))
    }

    /// Create a process holding nothing.
    pub fn add_process(&self, name: impl Into<String>) -> ProcessId {
        let now = self.clock.now_ms();
        self.state.write().add_process(name.into(), now)
    }

    /// Give `units` of a resource to a process. Repeated allocations of the
    /// same pair accumulate.
    ///
    /// # Errors
    /// `InvalidArgument` for zero units, `ProcessNotFound`/`ResourceNotFound`
    /// for unknown ids, `InsufficientUnits` if fewer units are free.
    pub fn allocate(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> Result<(), AllocationError> {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        log_rejection("allocate", state.allocate(process_id, resource_id, units, now))
    }

    /// [`Self::allocate`] a single unit.
    ///
    /// # Errors
    /// Same as [`Self::allocate`].
    pub fn allocate_one(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
    ) -> Result<(), AllocationError> {
        self.allocate(process_id, resource_id, 1)
    }

    /// Record that a process waits for `units` of a resource. Availability is
    /// not checked; requests model contention.
    ///
    /// # Errors
    /// `InvalidArgument` for zero units, `ProcessNotFound`/`ResourceNotFound`
    /// for unknown ids.
    pub fn request(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> Result<(), AllocationError> {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        log_rejection("request", state.request(process_id, resource_id, units, now))
    }

    /// [`Self::request`] a single unit.
    ///
    /// # Errors
    /// Same as [`Self::request`].
    pub fn request_one(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
    ) -> Result<(), AllocationError> {
        self.request(process_id, resource_id, 1)
    }

    /// Return everything a process holds on a resource. Returns the units
    /// released.
    ///
    /// # Errors
    /// `ProcessNotFound`/`ResourceNotFound` for unknown ids, `NotAllocated`
    /// if the process holds nothing there.
    pub fn release(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
    ) -> Result<u32, AllocationError> {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        log_rejection("release", state.release(process_id, resource_id, now))
    }

    /// Withdraw a pending request entirely. Returns the units withdrawn.
    ///
    /// # Errors
    /// `ProcessNotFound`/`ResourceNotFound` for unknown ids,
    /// `NoPendingRequest` if the process is not waiting there.
    pub fn cancel_request(
        &self,
        process_id: ProcessId,
        resource_id: ResourceId,
    ) -> Result<u32, AllocationError> {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        log_rejection("cancel_request", state.cancel_request(process_id, resource_id, now))
    }

    /// Release every holding and cancel every request of a process, then
    /// delete it.
    ///
    /// # Errors
    /// `ProcessNotFound` for an unknown id.
    pub fn remove_process(&self, process_id: ProcessId) -> Result<(), AllocationError> {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        log_rejection("remove_process", state.remove_process(process_id, now))
    }

    /// Delete a resource nobody holds. Pending requests on it are cancelled.
    ///
    /// # Errors
    /// `ResourceNotFound` for an unknown id, `ResourceInUse` if any unit is
    /// allocated.
    pub fn delete_resource(&self, resource_id: ResourceId) -> Result<(), AllocationError> {
        let now = self.clock.now_ms();
        let mut state = self.state.write();
        log_rejection("delete_resource", state.delete_resource(resource_id, now))
    }

    /// Drop all resources, processes, edges and history.
    pub fn reset(&self) {
        self.state.write().clear();
        tracing::info!("engine reset");
    }

    // ── Queries ────────────────────────────────────────────────

    /// Clone of one resource.
    #[must_use]
    pub fn get_resource(&self, resource_id: ResourceId) -> Option<Resource> {
        self.state.read().resources.get(&resource_id).cloned()
    }

    /// Clone of one process.
    #[must_use]
    pub fn get_process(&self, process_id: ProcessId) -> Option<Process> {
        self.state.read().processes.get(&process_id).cloned()
    }

    /// Clones of all resources in id order.
    #[must_use]
    pub fn get_resources(&self) -> Vec<Resource> {
        self.state.read().resources.values().cloned().collect()
    }

    /// Clones of all processes in id order.
    #[must_use]
    pub fn get_processes(&self) -> Vec<Process> {
        self.state.read().processes.values().cloned().collect()
    }

    /// True when any unit of the resource is held. False for unknown ids.
    #[must_use]
    pub fn is_resource_allocated(&self, resource_id: ResourceId) -> bool {
        self.state
            .read()
            .resources
            .get(&resource_id)
            .is_some_and(Resource::is_allocated)
    }

    /// Clone of the history log, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.read().history.entries().to_vec()
    }

    /// Renderer-neutral node and edge lists.
    #[must_use]
    pub fn get_graph_snapshot(&self) -> GraphSnapshot {
        let state = self.state.read();
        let deadlock = detect_deadlock(&state.graph);
        build_snapshot(&state, &deadlock)
    }

    /// Look for circular waits.
    #[must_use]
    pub fn detect_deadlock(&self) -> DeadlockReport {
        let report = detect_deadlock(&self.state.read().graph);
        if report.has_deadlock {
            tracing::warn!(
                cycles = report.cycles.len(),
                affected = report.affected_processes.len(),
                "deadlock detected"
            );
        }
        report
    }

    /// Usage per resource plus the recent activity trend.
    #[must_use]
    pub fn analyze_usage(&self) -> UsageReport {
        let state = self.state.read();
        UsageAnalyzer::new(&state.resources, &state.history, &self.config)
            .report(self.clock.now_ms())
    }

    /// Usage, trend and advisory suggestions.
    #[must_use]
    pub fn get_recommendations(&self) -> RecommendationReport {
        let state = self.state.read();
        let deadlock = detect_deadlock(&state.graph);
        UsageAnalyzer::new(&state.resources, &state.history, &self.config)
            .recommendations(state.processes.len(), &deadlock)
    }

    /// Every disagreement between the entity maps and the graph. Empty when
    /// the engine is consistent, which it always should be.
    #[must_use]
    pub fn verify_consistency(&self) -> Vec<String> {
        self.state.read().consistency_violations()
    }
}
