//! Append-only allocation history.
//!
//! The log is only read by analytics. Entries are never edited or removed
//! except by a full engine reset.

use serde::{Deserialize, Serialize};

use crate::util::types::{ProcessId, ResourceId};

/// Kind of allocation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// Units were allocated to a process.
    Allocation,
    /// A process started waiting for units.
    Request,
    /// A process gave back everything it held on a resource.
    Release,
    /// A pending request was withdrawn.
    CancelRequest,
}

/// Immutable record of one allocation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Event time in milliseconds since the Unix epoch.
    pub timestamp_ms: u128,
    /// What happened.
    pub kind: HistoryKind,
    /// Process involved.
    pub process_id: ProcessId,
    /// Resource involved.
    pub resource_id: ResourceId,
    /// Units moved by the event.
    pub units: u32,
}

impl HistoryEntry {
    /// Build an entry.
    #[must_use]
    pub const fn new(
        timestamp_ms: u128,
        kind: HistoryKind,
        process_id: ProcessId,
        resource_id: ResourceId,
        units: u32,
    ) -> Self {
        Self {
            timestamp_ms,
            kind,
            process_id,
            resource_id,
            units,
        }
    }
}

/// Time-ordered event log. Append order is chronological order.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// Create an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The most recent `n` entries, oldest of the window first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Entries touching one resource, oldest first.
    pub fn for_resource(&self, resource: ResourceId) -> impl Iterator<Item = &HistoryEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.resource_id == resource)
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
