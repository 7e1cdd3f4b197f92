//! Identifier newtypes and shared enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::AllocationError;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = AllocationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(AllocationError::InvalidArgument(
                        concat!($label, " id is required").into(),
                    ));
                }
                Uuid::parse_str(trimmed).map(Self).map_err(|e| {
                    AllocationError::InvalidArgument(format!(
                        concat!("malformed ", $label, " id `{}`: {}"),
                        trimmed, e
                    ))
                })
            }
        }
    };
}

entity_id!(
    /// Opaque identifier of a resource pool.
    ResourceId,
    "resource"
);

entity_id!(
    /// Opaque identifier of a process.
    ProcessId,
    "process"
);

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A pool of resource units.
    Resource,
    /// A process holding or waiting for units.
    Process,
}

/// Node of the allocation graph.
///
/// Ordering puts every resource before every process, then orders by UUID.
/// Cycle enumeration relies on this total order for reproducible output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeId {
    /// Resource node.
    Resource(ResourceId),
    /// Process node.
    Process(ProcessId),
}

impl NodeId {
    /// Kind implied by the variant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Resource(_) => NodeKind::Resource,
            Self::Process(_) => NodeKind::Process,
        }
    }

    /// Process identifier, if this is a process node.
    #[must_use]
    pub const fn as_process(&self) -> Option<ProcessId> {
        match self {
            Self::Process(id) => Some(*id),
            Self::Resource(_) => None,
        }
    }

    /// Resource identifier, if this is a resource node.
    #[must_use]
    pub const fn as_resource(&self) -> Option<ResourceId> {
        match self {
            Self::Resource(id) => Some(*id),
            Self::Process(_) => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(id) => fmt::Display::fmt(id, f),
            Self::Process(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl From<ResourceId> for NodeId {
    fn from(id: ResourceId) -> Self {
        Self::Resource(id)
    }
}

impl From<ProcessId> for NodeId {
    fn from(id: ProcessId) -> Self {
        Self::Process(id)
    }
}

/// Priority attached to advisory suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational.
    Low,
    /// Worth a look.
    Medium,
    /// Act soon.
    High,
    /// Act now.
    Critical,
}
