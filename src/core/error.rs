//! Error types for allocation graph operations.

use thiserror::Error;

use crate::util::types::{ProcessId, ResourceId};

/// Errors produced by engine mutations.
///
/// Every failed mutation returns exactly one of these and leaves the engine
/// state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Caller supplied an argument that is invalid before any lookup.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Referenced process does not exist.
    #[error("process not found: {0}")]
    ProcessNotFound(ProcessId),
    /// Referenced resource does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),
    /// Allocation asks for more units than are currently available.
    #[error("insufficient units on resource {resource}: requested {requested}, available {available}")]
    InsufficientUnits {
        /// Target resource.
        resource: ResourceId,
        /// Units asked for.
        requested: u32,
        /// Units free at the time of the call.
        available: u32,
    },
    /// Release of a resource the process does not hold.
    #[error("resource {resource} is not allocated to process {process}")]
    NotAllocated {
        /// Process that attempted the release.
        process: ProcessId,
        /// Resource it does not hold.
        resource: ResourceId,
    },
    /// Cancellation of a request that does not exist.
    #[error("no pending request for resource {resource} from process {process}")]
    NoPendingRequest {
        /// Process that attempted the cancellation.
        process: ProcessId,
        /// Resource with no pending request.
        resource: ResourceId,
    },
    /// Deletion of a resource that still has units allocated.
    #[error("resource {resource} is in use: {allocated} of {total} units allocated")]
    ResourceInUse {
        /// Resource that cannot be deleted.
        resource: ResourceId,
        /// Units currently held by processes.
        allocated: u32,
        /// Total units of the resource.
        total: u32,
    },
}

impl AllocationError {
    /// Stable machine-readable kind, suitable for collaborators mapping errors
    /// to user-facing messages or status codes.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::ProcessNotFound(_) | Self::ResourceNotFound(_) => "not_found",
            Self::InsufficientUnits { .. } => "insufficient_units",
            Self::NotAllocated { .. } => "not_allocated",
            Self::NoPendingRequest { .. } => "no_pending_request",
            Self::ResourceInUse { .. } => "resource_in_use",
        }
    }

    /// True for either flavour of missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ProcessNotFound(_) | Self::ResourceNotFound(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
