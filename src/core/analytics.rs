//! Usage analytics and advisory suggestions.
//!
//! Everything here is a read-only projection of the entity store and the
//! history log. Reports are recomputed on every call and never stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::deadlock::DeadlockReport;
use crate::core::history::{HistoryEntry, HistoryKind, HistoryLog};
use crate::core::model::Resource;
use crate::util::types::{Priority, ProcessId, ResourceId};

/// Point-in-time usage of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Resource identifier.
    pub resource_id: ResourceId,
    /// Resource display name.
    pub name: String,
    /// Units the resource was created with.
    pub total_units: u32,
    /// Units currently held.
    pub current_usage: u32,
    /// Units currently free.
    pub available_units: u32,
    /// Held share in percent, rounded to one decimal.
    pub usage_percentage: f64,
    /// Distinct processes holding units.
    pub allocation_count: usize,
    /// Distinct processes waiting for units.
    pub request_count: usize,
    /// Mean seconds between an allocation and its matching release, rounded
    /// to one decimal. Zero when no pair has completed.
    pub average_allocation_secs: f64,
}

/// One point of the recent-activity series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Timestamp of the history entry.
    pub timestamp_ms: u128,
    /// Running allocation count within the window after this entry.
    pub allocations: i64,
}

/// One point of the per-event activity series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPoint {
    /// Timestamp of the history entry.
    pub timestamp_ms: u128,
    /// `1` for an allocation, `-1` for a release, `0` otherwise.
    pub change: i64,
}

/// Output of [`crate::core::AllocationEngine::analyze_usage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Per-resource rows in resource id order.
    pub resource_usage: Vec<ResourceUsage>,
    /// Sum of distinct holders over all resources.
    pub total_allocations: usize,
    /// Sum of distinct waiters over all resources.
    pub total_requests: usize,
    /// Running allocation count over the most recent history entries.
    pub allocation_trend: Vec<TrendPoint>,
    /// When the report was computed.
    pub generated_at_ms: u128,
}

/// Severity used by renderers to colour a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSeverity {
    /// Informational.
    Info,
    /// Something is drifting.
    Warning,
    /// Something is broken.
    Danger,
}

/// Machine-actionable tag of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    /// Add units to a saturated resource.
    IncreaseUnits,
    /// Remove units from an idle resource.
    DecreaseUnits,
    /// Shorten how long holders keep a resource.
    OptimizeAllocation,
    /// Break a circular wait.
    ResolveDeadlock,
}

/// Advisory suggestion. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Display severity.
    pub severity: SuggestionSeverity,
    /// Urgency.
    pub priority: Priority,
    /// Short heading.
    pub title: String,
    /// One-line summary.
    pub message: String,
    /// Longer explanation.
    pub description: String,
    /// What a collaborator could do about it.
    pub action: SuggestionAction,
    /// Resource the suggestion is about, if any.
    pub resource_id: Option<ResourceId>,
    /// Processes caught in a deadlock, for `resolve_deadlock` only.
    pub affected_processes: Vec<ProcessId>,
}

/// Output of [`crate::core::AllocationEngine::get_recommendations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    /// Number of live processes.
    pub active_processes: usize,
    /// Number of live resources.
    pub total_resources: usize,
    /// Sum of distinct holders over all resources.
    pub total_allocations: usize,
    /// Per-resource rows in resource id order.
    pub resource_usage: Vec<ResourceUsage>,
    /// Suggestions, per resource in id order, deadlock last.
    pub suggestions: Vec<Suggestion>,
    /// Per-entry allocation change over the most recent history entries.
    pub trend: Vec<ActivityPoint>,
}

/// Read-only view over engine state used to build reports.
pub struct UsageAnalyzer<'a> {
    resources: &'a BTreeMap<ResourceId, Resource>,
    history: &'a HistoryLog,
    config: &'a EngineConfig,
}

impl<'a> UsageAnalyzer<'a> {
    /// Borrow the pieces of state the analyzer reads.
    #[must_use]
    pub const fn new(
        resources: &'a BTreeMap<ResourceId, Resource>,
        history: &'a HistoryLog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            resources,
            history,
            config,
        }
    }

    /// Usage rows for every resource.
    #[must_use]
    pub fn resource_usage(&self) -> Vec<ResourceUsage> {
        self.resources
            .values()
            .map(|resource| ResourceUsage {
                resource_id: resource.id(),
                name: resource.name().to_owned(),
                total_units: resource.total_units(),
                current_usage: resource.allocated_units(),
                available_units: resource.available_units(),
                usage_percentage: round1(resource.usage_percentage()),
                allocation_count: resource.allocated_to().len(),
                request_count: resource.requested_by().len(),
                average_allocation_secs: round1(self.average_allocation_secs(resource.id())),
            })
            .collect()
    }

    /// Mean hold time for a resource in seconds.
    ///
    /// Each `allocation` entry is paired with the next `release` of the same
    /// process on the same resource. Unreleased allocations are ignored.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_allocation_secs(&self, resource: ResourceId) -> f64 {
        let entries: Vec<&HistoryEntry> = self.history.for_resource(resource).collect();
        let mut total_ms: u128 = 0;
        let mut matched: u32 = 0;

        for (idx, entry) in entries.iter().enumerate() {
            if entry.kind != HistoryKind::Allocation {
                continue;
            }
            let release = entries[idx + 1..].iter().find(|later| {
                later.kind == HistoryKind::Release && later.process_id == entry.process_id
            });
            if let Some(release) = release {
                total_ms += release.timestamp_ms.saturating_sub(entry.timestamp_ms);
                matched += 1;
            }
        }

        if matched == 0 {
            return 0.0;
        }
        total_ms as f64 / 1000.0 / f64::from(matched)
    }

    /// Running allocation count over the configured trend window.
    #[must_use]
    pub fn trend(&self) -> Vec<TrendPoint> {
        let mut running: i64 = 0;
        self.history
            .recent(self.config.trend_window)
            .iter()
            .map(|entry| {
                match entry.kind {
                    HistoryKind::Allocation => running += 1,
                    HistoryKind::Release => running -= 1,
                    HistoryKind::Request | HistoryKind::CancelRequest => {}
                }
                TrendPoint {
                    timestamp_ms: entry.timestamp_ms,
                    allocations: running,
                }
            })
            .collect()
    }

    /// Per-entry allocation change over the configured trend window.
    #[must_use]
    pub fn activity(&self) -> Vec<ActivityPoint> {
        self.history
            .recent(self.config.trend_window)
            .iter()
            .map(|entry| ActivityPoint {
                timestamp_ms: entry.timestamp_ms,
                change: match entry.kind {
                    HistoryKind::Allocation => 1,
                    HistoryKind::Release => -1,
                    HistoryKind::Request | HistoryKind::CancelRequest => 0,
                },
            })
            .collect()
    }

    /// Full usage report.
    #[must_use]
    pub fn report(&self, now_ms: u128) -> UsageReport {
        let resource_usage = self.resource_usage();
        let total_allocations = resource_usage.iter().map(|row| row.allocation_count).sum();
        let total_requests = resource_usage.iter().map(|row| row.request_count).sum();
        UsageReport {
            resource_usage,
            total_allocations,
            total_requests,
            allocation_trend: self.trend(),
            generated_at_ms: now_ms,
        }
    }

    /// Suggestions for the current state.
    #[must_use]
    pub fn suggestions(&self, deadlock: &DeadlockReport) -> Vec<Suggestion> {
        let thresholds = &self.config.thresholds;
        let mut suggestions = Vec::new();

        for resource in self.resources.values() {
            let usage = resource.usage_percentage();
            let name = resource.name();

            if usage > thresholds.high_utilization_pct {
                suggestions.push(Suggestion {
                    severity: SuggestionSeverity::Warning,
                    priority: Priority::High,
                    title: "High Resource Utilization".into(),
                    message: format!("Resource {name} is highly utilized ({usage:.1}%)"),
                    description: format!(
                        "Consider adding more units to {name} to prevent bottlenecks."
                    ),
                    action: SuggestionAction::IncreaseUnits,
                    resource_id: Some(resource.id()),
                    affected_processes: Vec::new(),
                });
            } else if usage < thresholds.low_utilization_pct && resource.total_units() > 1 {
                suggestions.push(Suggestion {
                    severity: SuggestionSeverity::Info,
                    priority: Priority::Low,
                    title: "Low Resource Utilization".into(),
                    message: format!("Resource {name} is underutilized ({usage:.1}%)"),
                    description: format!(
                        "Consider reducing units of {name} to optimize resource allocation."
                    ),
                    action: SuggestionAction::DecreaseUnits,
                    resource_id: Some(resource.id()),
                    affected_processes: Vec::new(),
                });
            }

            let average = self.average_allocation_secs(resource.id());
            if average > thresholds.long_allocation_secs {
                suggestions.push(Suggestion {
                    severity: SuggestionSeverity::Warning,
                    priority: Priority::Medium,
                    title: "High Allocation Time".into(),
                    message: format!("Resource {name} has high average allocation time"),
                    description: format!(
                        "Average allocation time of {average:.1}s for {name}. Consider optimizing usage patterns."
                    ),
                    action: SuggestionAction::OptimizeAllocation,
                    resource_id: Some(resource.id()),
                    affected_processes: Vec::new(),
                });
            }
        }

        if deadlock.has_deadlock {
            let names: Vec<String> = deadlock
                .affected_processes
                .iter()
                .map(ToString::to_string)
                .collect();
            suggestions.push(Suggestion {
                severity: SuggestionSeverity::Danger,
                priority: Priority::Critical,
                title: "Potential Deadlock Detected".into(),
                message: format!(
                    "System may be in a deadlock state involving processes: {}",
                    names.join(", ")
                ),
                description: "Review resource allocation strategy to prevent deadlock situation."
                    .into(),
                action: SuggestionAction::ResolveDeadlock,
                resource_id: None,
                affected_processes: deadlock.affected_processes.clone(),
            });
        }

        suggestions
    }

    /// Full recommendation report.
    #[must_use]
    pub fn recommendations(
        &self,
        active_processes: usize,
        deadlock: &DeadlockReport,
    ) -> RecommendationReport {
        let resource_usage = self.resource_usage();
        RecommendationReport {
            active_processes,
            total_resources: self.resources.len(),
            total_allocations: resource_usage.iter().map(|row| row.allocation_count).sum(),
            resource_usage,
            suggestions: self.suggestions(deadlock),
            trend: self.activity(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
