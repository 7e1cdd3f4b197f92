//! Allocation state machine, graph model, deadlock detection and analytics.

pub mod analytics;
pub mod deadlock;
pub mod engine;
pub mod error;
pub mod graph;
pub mod history;
pub mod model;
pub mod snapshot;

pub use analytics::{
    ActivityPoint, RecommendationReport, ResourceUsage, Suggestion, SuggestionAction, SuggestionSeverity,
    TrendPoint, UsageAnalyzer, UsageReport,
};
pub use deadlock::{detect_deadlock, simple_cycles, DeadlockReport};
pub use engine::AllocationEngine;
pub use error::{AllocationError, AppResult};
pub use graph::{AllocationGraph, EdgeData, EdgeKind, NodeData};
pub use history::{HistoryEntry, HistoryKind, HistoryLog};
pub use model::{Process, Resource};
pub use snapshot::{GraphSnapshot, NodeStatus, SnapshotEdge, SnapshotNode};
