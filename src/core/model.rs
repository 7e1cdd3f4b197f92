//! Entity records owned by the engine.
//!
//! Callers only ever see clones of these records. All mutation goes through
//! [`crate::core::AllocationEngine`], which keeps the unit accounting
//! `available_units + sum(allocated_to) == total_units` intact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::types::{ProcessId, ResourceId};

/// A named pool of interchangeable units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) total_units: u32,
    pub(crate) available_units: u32,
    pub(crate) allocated_to: BTreeMap<ProcessId, u32>,
    pub(crate) requested_by: BTreeMap<ProcessId, u32>,
}

impl Resource {
    pub(crate) fn new(id: ResourceId, name: String, total_units: u32) -> Self {
        Self {
            id,
            name,
            total_units,
            available_units: total_units,
            allocated_to: BTreeMap::new(),
            requested_by: BTreeMap::new(),
        }
    }

    /// Resource identifier.
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Display name (not necessarily unique).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units the resource was created with.
    #[must_use]
    pub const fn total_units(&self) -> u32 {
        self.total_units
    }

    /// Units not held by any process.
    #[must_use]
    pub const fn available_units(&self) -> u32 {
        self.available_units
    }

    /// Units held per process. Only processes holding at least one unit appear.
    #[must_use]
    pub const fn allocated_to(&self) -> &BTreeMap<ProcessId, u32> {
        &self.allocated_to
    }

    /// Units pending per process. Only processes waiting on at least one unit appear.
    #[must_use]
    pub const fn requested_by(&self) -> &BTreeMap<ProcessId, u32> {
        &self.requested_by
    }

    /// Sum of units currently held.
    #[must_use]
    pub fn allocated_units(&self) -> u32 {
        self.allocated_to.values().sum()
    }

    /// True when any unit is held by a process.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.available_units != self.total_units
    }

    /// Share of units held, as a percentage. Zero for an empty pool.
    #[must_use]
    pub fn usage_percentage(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        f64::from(self.allocated_units()) / f64::from(self.total_units) * 100.0
    }

    pub(crate) fn hold(&mut self, process: ProcessId, units: u32) {
        self.available_units -= units;
        *self.allocated_to.entry(process).or_insert(0) += units;
    }

    pub(crate) fn release_holder(&mut self, process: ProcessId) -> Option<u32> {
        let units = self.allocated_to.remove(&process)?;
        self.available_units += units;
        Some(units)
    }

    /// Pending units for `process` after adding `units`, or `None` on overflow.
    pub(crate) fn pending_after(&self, process: ProcessId, units: u32) -> Option<u32> {
        self.requested_by
            .get(&process)
            .map_or(Some(units), |pending| pending.checked_add(units))
    }

    pub(crate) fn set_request(&mut self, process: ProcessId, units: u32) {
        self.requested_by.insert(process, units);
    }

    pub(crate) fn drop_request(&mut self, process: ProcessId) -> Option<u32> {
        self.requested_by.remove(&process)
    }
}

/// An entity that holds and requests resource units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub(crate) id: ProcessId,
    pub(crate) name: String,
    pub(crate) allocated_resources: BTreeMap<ResourceId, u32>,
    pub(crate) requested_resources: BTreeMap<ResourceId, u32>,
    pub(crate) created_at_ms: u128,
}

impl Process {
    pub(crate) fn new(id: ProcessId, name: String, created_at_ms: u128) -> Self {
        Self {
            id,
            name,
            allocated_resources: BTreeMap::new(),
            requested_resources: BTreeMap::new(),
            created_at_ms,
        }
    }

    /// Process identifier.
    #[must_use]
    pub const fn id(&self) -> ProcessId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units held per resource.
    #[must_use]
    pub const fn allocated_resources(&self) -> &BTreeMap<ResourceId, u32> {
        &self.allocated_resources
    }

    /// Units pending per resource.
    #[must_use]
    pub const fn requested_resources(&self) -> &BTreeMap<ResourceId, u32> {
        &self.requested_resources
    }

    /// Creation timestamp in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn created_at_ms(&self) -> u128 {
        self.created_at_ms
    }

    /// True when the process waits on at least one resource.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        !self.requested_resources.is_empty()
    }

    /// True when the process holds at least one unit.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        !self.allocated_resources.is_empty()
    }
}
