//! Tests for the history log

use prometheus_allocation_graph::core::{HistoryEntry, HistoryKind, HistoryLog};
use prometheus_allocation_graph::util::{ProcessId, ResourceId};

#[test]
fn test_history_log_appends_in_order() {
    let mut log = HistoryLog::new();
    let p = ProcessId::new_v4();
    let r = ResourceId::new_v4();

    log.record(HistoryEntry::new(10, HistoryKind::Request, p, r, 2));
    log.record(HistoryEntry::new(10, HistoryKind::Allocation, p, r, 2));
    assert_eq!(log.len(), 2);

    let entries = log.entries();
    assert_eq!(entries[0].kind, HistoryKind::Request);
    assert_eq!(entries[1].kind, HistoryKind::Allocation);
    assert_eq!(entries[1].units, 2);
}

#[test]
fn test_history_kind_serializes_snake_case() {
    let json = serde_json::to_string(&HistoryKind::CancelRequest).unwrap();
    assert_eq!(json, "\"cancel_request\"");
}

#[test]
fn test_empty_log() {
    let log = HistoryLog::new();
    assert!(log.is_empty());
    assert!(log.recent(10).is_empty());
}
