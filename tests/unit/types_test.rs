//! Tests for identifiers, clock and shared enums

use prometheus_allocation_graph::core::AllocationError;
use prometheus_allocation_graph::util::{
    Clock, ManualClock, NodeId, NodeKind, Priority, ProcessId, ResourceId,
};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
}

#[test]
fn test_id_round_trips_through_display() {
    let id = ResourceId::new_v4();
    let parsed: ResourceId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn test_malformed_id_is_invalid_argument() {
    let err = "not-a-uuid".parse::<ProcessId>().unwrap_err();
    assert!(matches!(err, AllocationError::InvalidArgument(_)));

    let err = "   ".parse::<ResourceId>().unwrap_err();
    assert_eq!(
        err,
        AllocationError::InvalidArgument("resource id is required".into())
    );
}

#[test]
fn test_node_ordering_puts_resources_first() {
    let r = NodeId::from(ResourceId::new_v4());
    let p = NodeId::from(ProcessId::new_v4());
    assert!(r < p);
    assert_eq!(r.kind(), NodeKind::Resource);
    assert_eq!(p.kind(), NodeKind::Process);
    assert!(p.as_process().is_some());
    assert!(p.as_resource().is_none());
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new(5);
    clock.advance_ms(10);
    assert_eq!(clock.now_ms(), 15);
}
