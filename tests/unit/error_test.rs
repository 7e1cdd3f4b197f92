//! Tests for error types

use prometheus_allocation_graph::core::AllocationError;
use prometheus_allocation_graph::util::{ProcessId, ResourceId};

#[test]
fn test_invalid_argument_error() {
    let err = AllocationError::InvalidArgument("units must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid argument: units must be greater than 0"
    );
    assert_eq!(err.kind(), "invalid_argument");
}

#[test]
fn test_not_found_errors_share_kind() {
    let p = ProcessId::new_v4();
    let r = ResourceId::new_v4();
    let missing_process = AllocationError::ProcessNotFound(p);
    let missing_resource = AllocationError::ResourceNotFound(r);

    assert_eq!(format!("{}", missing_process), format!("process not found: {p}"));
    assert_eq!(format!("{}", missing_resource), format!("resource not found: {r}"));
    assert_eq!(missing_process.kind(), "not_found");
    assert_eq!(missing_resource.kind(), "not_found");
    assert!(missing_process.is_not_found());
    assert!(missing_resource.is_not_found());
}

#[test]
fn test_insufficient_units_error() {
    let r = ResourceId::new_v4();
    let err = AllocationError::InsufficientUnits {
        resource: r,
        requested: 3,
        available: 1,
    };
    assert_eq!(
        format!("{}", err),
        format!("insufficient units on resource {r}: requested 3, available 1")
    );
    assert_eq!(err.kind(), "insufficient_units");
    assert!(!err.is_not_found());
}

#[test]
fn test_remaining_kinds() {
    let p = ProcessId::new_v4();
    let r = ResourceId::new_v4();
    assert_eq!(
        AllocationError::NotAllocated { process: p, resource: r }.kind(),
        "not_allocated"
    );
    assert_eq!(
        AllocationError::NoPendingRequest { process: p, resource: r }.kind(),
        "no_pending_request"
    );
    let in_use = AllocationError::ResourceInUse {
        resource: r,
        allocated: 2,
        total: 4,
    };
    assert_eq!(in_use.kind(), "resource_in_use");
    assert!(format!("{}", in_use).ends_with("2 of 4 units allocated"));
}
