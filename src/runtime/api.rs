//! Presentation-neutral command surface.
//!
//! Web handlers, GUI callbacks and CLIs hand untyped input to [`dispatch`]
//! (or raw JSON to [`dispatch_json`]); argument parsing and validation happen
//! here so the engine only ever sees typed values.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{
    AllocationEngine, AllocationError, AppResult, DeadlockReport, GraphSnapshot, Process,
    RecommendationReport, Resource, UsageReport,
};
use crate::util::types::{ProcessId, ResourceId};

const fn one_unit() -> i64 {
    1
}

/// One call into the engine, with arguments as collaborators receive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Create a resource.
    AddResource {
        /// Display name; must not be blank.
        name: String,
        /// Unit count; must be positive.
        total_units: i64,
    },
    /// Create a process.
    AddProcess {
        /// Display name; must not be blank.
        name: String,
    },
    /// Remove a process and everything it holds or waits on.
    RemoveProcess {
        /// Process id string.
        process_id: String,
    },
    /// Delete an unallocated resource.
    DeleteResource {
        /// Resource id string.
        resource_id: String,
    },
    /// Allocate units.
    Allocate {
        /// Process id string.
        process_id: String,
        /// Resource id string.
        resource_id: String,
        /// Units, default 1.
        #[serde(default = "one_unit")]
        units: i64,
    },
    /// Request units.
    Request {
        /// Process id string.
        process_id: String,
        /// Resource id string.
        resource_id: String,
        /// Units, default 1.
        #[serde(default = "one_unit")]
        units: i64,
    },
    /// Release everything held on a resource.
    Release {
        /// Process id string.
        process_id: String,
        /// Resource id string.
        resource_id: String,
    },
    /// Withdraw a pending request.
    CancelRequest {
        /// Process id string.
        process_id: String,
        /// Resource id string.
        resource_id: String,
    },
    /// Fetch one resource.
    GetResource {
        /// Resource id string.
        resource_id: String,
    },
    /// Fetch all resources.
    GetResources,
    /// Fetch all processes.
    GetProcesses,
    /// Ask whether any unit of a resource is held.
    IsResourceAllocated {
        /// Resource id string.
        resource_id: String,
    },
    /// Fetch the renderer-neutral graph.
    GetGraphSnapshot,
    /// Run deadlock detection.
    DetectDeadlock,
    /// Compute usage analytics.
    AnalyzeUsage,
    /// Compute advisory suggestions.
    GetRecommendations,
    /// Clear all state.
    Reset,
}

/// Result of a successful [`Command`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum Response {
    /// New resource id.
    ResourceAdded(ResourceId),
    /// New process id.
    ProcessAdded(ProcessId),
    /// Mutation applied, nothing to return.
    Done,
    /// Units returned by a release.
    Released(u32),
    /// Units withdrawn by a cancellation.
    Cancelled(u32),
    /// Resource lookup.
    Resource(Option<Resource>),
    /// All resources.
    Resources(Vec<Resource>),
    /// All processes.
    Processes(Vec<Process>),
    /// Allocation flag of a resource.
    IsAllocated(bool),
    /// Graph snapshot.
    Snapshot(GraphSnapshot),
    /// Deadlock report.
    Deadlock(DeadlockReport),
    /// Usage report.
    Usage(UsageReport),
    /// Recommendation report.
    Recommendations(RecommendationReport),
}

/// Error payload for collaborators to show users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error kind, e.g. `insufficient_units`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&AllocationError> for ErrorBody {
    fn from(err: &AllocationError) -> Self {
        Self {
            kind: err.kind().to_owned(),
            message: err.to_string(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}

fn require_name(name: String, what: &str) -> Result<String, AllocationError> {
    if name.trim().is_empty() {
        return Err(AllocationError::InvalidArgument(format!(
            "{what} name is required"
        )));
    }
    Ok(name)
}

fn positive_units(raw: i64) -> Result<u32, AllocationError> {
    if raw < 1 {
        return Err(AllocationError::InvalidArgument(
            "units must be greater than 0".into(),
        ));
    }
    u32::try_from(raw)
        .map_err(|_| AllocationError::InvalidArgument(format!("units out of range: {raw}")))
}

fn ids(process_id: &str, resource_id: &str) -> Result<(ProcessId, ResourceId), AllocationError> {
    Ok((process_id.parse()?, resource_id.parse()?))
}

/// Validate arguments and run one command against the engine.
///
/// # Errors
/// `InvalidArgument` for blank names, non-positive units or malformed ids;
/// otherwise whatever the engine operation returns.
pub fn dispatch(engine: &AllocationEngine, command: Command) -> Result<Response, AllocationError> {
    let response = match command {
        Command::AddResource { name, total_units } => {
            let name = require_name(name, "resource")?;
            let units = positive_units(total_units)?;
            Response::ResourceAdded(engine.add_resource(name, units)?)
        }
        Command::AddProcess { name } => {
            Response::ProcessAdded(engine.add_process(require_name(name, "process")?))
        }
        Command::RemoveProcess { process_id } => {
            engine.remove_process(process_id.parse()?)?;
            Response::Done
        }
        Command::DeleteResource { resource_id } => {
            engine.delete_resource(resource_id.parse()?)?;
            Response::Done
        }
        Command::Allocate {
            process_id,
            resource_id,
            units,
        } => {
            let (p, r) = ids(&process_id, &resource_id)?;
            engine.allocate(p, r, positive_units(units)?)?;
            Response::Done
        }
        Command::Request {
            process_id,
            resource_id,
            units,
        } => {
            let (p, r) = ids(&process_id, &resource_id)?;
            engine.request(p, r, positive_units(units)?)?;
            Response::Done
        }
        Command::Release {
            process_id,
            resource_id,
        } => {
            let (p, r) = ids(&process_id, &resource_id)?;
            Response::Released(engine.release(p, r)?)
        }
        Command::CancelRequest {
            process_id,
            resource_id,
        } => {
            let (p, r) = ids(&process_id, &resource_id)?;
            Response::Cancelled(engine.cancel_request(p, r)?)
        }
        Command::GetResource { resource_id } => {
            Response::Resource(engine.get_resource(resource_id.parse()?))
        }
        Command::GetResources => Response::Resources(engine.get_resources()),
        Command::GetProcesses => Response::Processes(engine.get_processes()),
        Command::IsResourceAllocated { resource_id } => {
            Response::IsAllocated(engine.is_resource_allocated(resource_id.parse()?))
        }
        Command::GetGraphSnapshot => Response::Snapshot(engine.get_graph_snapshot()),
        Command::DetectDeadlock => Response::Deadlock(engine.detect_deadlock()),
        Command::AnalyzeUsage => Response::Usage(engine.analyze_usage()),
        Command::GetRecommendations => Response::Recommendations(engine.get_recommendations()),
        Command::Reset => {
            engine.reset();
            Response::Done
        }
    };
    Ok(response)
}

/// JSON in, JSON out. Engine failures surface as [`AllocationError`] inside
/// the `anyhow::Error` and can be recovered with `downcast_ref`.
///
/// # Errors
/// Malformed JSON, any [`dispatch`] error, or a serialization failure.
pub fn dispatch_json(engine: &AllocationEngine, input: &str) -> AppResult<String> {
    let command: Command = serde_json::from_str(input).context("malformed command")?;
    let response = dispatch(engine, command)?;
    serde_json::to_string(&response).context("failed to serialize response")
}
