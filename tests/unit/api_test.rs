//! Tests for the command surface

use prometheus_allocation_graph::core::{AllocationEngine, AllocationError};
use prometheus_allocation_graph::runtime::{dispatch, dispatch_json, health, Command, ErrorBody, Response};
use serde_json::Value;

fn add_resource(engine: &AllocationEngine, name: &str, units: i64) -> String {
    match dispatch(
        engine,
        Command::AddResource {
            name: name.into(),
            total_units: units,
        },
    )
    .unwrap()
    {
        Response::ResourceAdded(id) => id.to_string(),
        other => panic!("unexpected response: {other:?}"),
    }
}

fn add_process(engine: &AllocationEngine, name: &str) -> String {
    match dispatch(engine, Command::AddProcess { name: name.into() }).unwrap() {
        Response::ProcessAdded(id) => id.to_string(),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn test_health() {
    assert!(health().ok);
}

#[test]
fn test_blank_names_are_rejected() {
    let engine = AllocationEngine::new();
    let err = dispatch(
        &engine,
        Command::AddResource {
            name: "  ".into(),
            total_units: 1,
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");

    let err = dispatch(&engine, Command::AddProcess { name: String::new() }).unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
    assert!(engine.get_processes().is_empty());
}

#[test]
fn test_non_positive_units_are_rejected() {
    let engine = AllocationEngine::new();
    let err = dispatch(
        &engine,
        Command::AddResource {
            name: "disk".into(),
            total_units: -3,
        },
    )
    .unwrap_err();
    assert!(matches!(err, AllocationError::InvalidArgument(_)));

    let r = add_resource(&engine, "disk", 2);
    let p = add_process(&engine, "worker");
    let err = dispatch(
        &engine,
        Command::Allocate {
            process_id: p,
            resource_id: r,
            units: 0,
        },
    )
    .unwrap_err();
    assert!(matches!(err, AllocationError::InvalidArgument(_)));
}

#[test]
fn test_malformed_ids_are_rejected_before_lookup() {
    let engine = AllocationEngine::new();
    let err = dispatch(
        &engine,
        Command::Release {
            process_id: "garbage".into(),
            resource_id: "also garbage".into(),
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
}

#[test]
fn test_allocate_release_cycle_through_dispatch() {
    let engine = AllocationEngine::new();
    let r = add_resource(&engine, "disk", 3);
    let p = add_process(&engine, "worker");

    dispatch(
        &engine,
        Command::Allocate {
            process_id: p.clone(),
            resource_id: r.clone(),
            units: 2,
        },
    )
    .unwrap();
    match dispatch(&engine, Command::IsResourceAllocated { resource_id: r.clone() }).unwrap() {
        Response::IsAllocated(flag) => assert!(flag),
        other => panic!("unexpected response: {other:?}"),
    }

    match dispatch(
        &engine,
        Command::Release {
            process_id: p,
            resource_id: r.clone(),
        },
    )
    .unwrap()
    {
        Response::Released(units) => assert_eq!(units, 2),
        other => panic!("unexpected response: {other:?}"),
    }

    dispatch(&engine, Command::DeleteResource { resource_id: r }).unwrap();
    assert!(engine.get_resources().is_empty());
}

#[test]
fn test_dispatch_json_round() {
    let engine = AllocationEngine::new();
    let out = dispatch_json(&engine, r#"{"op":"add_resource","name":"gpu","total_units":4}"#).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["result"], "resource_added");
    let resource_id = value["data"].as_str().unwrap().to_string();

    let out = dispatch_json(&engine, r#"{"op":"add_process","name":"trainer"}"#).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    let process_id = value["data"].as_str().unwrap().to_string();

    // Units default to one.
    let cmd = format!(r#"{{"op":"request","process_id":"{process_id}","resource_id":"{resource_id}"}}"#);
    dispatch_json(&engine, &cmd).unwrap();

    let out = dispatch_json(&engine, r#"{"op":"get_graph_snapshot"}"#).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["result"], "snapshot");
    let edges = value["data"]["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["kind"], "request");
    assert_eq!(edges[0]["units"], 1);
    assert_eq!(edges[0]["title"], "1 unit requested");
}

#[test]
fn test_dispatch_json_surfaces_engine_errors() {
    let engine = AllocationEngine::new();
    let out = dispatch_json(&engine, r#"{"op":"add_resource","name":"gpu","total_units":1}"#).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    let resource_id = value["data"].as_str().unwrap().to_string();
    let out = dispatch_json(&engine, r#"{"op":"add_process","name":"a"}"#).unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    let process_id = value["data"].as_str().unwrap().to_string();

    let cmd = format!(
        r#"{{"op":"allocate","process_id":"{process_id}","resource_id":"{resource_id}","units":5}}"#
    );
    let err = dispatch_json(&engine, &cmd).unwrap_err();
    let engine_err = err.downcast_ref::<AllocationError>().unwrap();
    let body = ErrorBody::from(engine_err);
    assert_eq!(body.kind, "insufficient_units");
    assert!(body.message.contains("requested 5, available 1"));
}

#[test]
fn test_dispatch_json_rejects_unknown_op() {
    let engine = AllocationEngine::new();
    let err = dispatch_json(&engine, r#"{"op":"explode"}"#).unwrap_err();
    assert!(err.to_string().contains("malformed command"));
}
