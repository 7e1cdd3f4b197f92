//! Tests for builder modules

use std::sync::Arc;

use prometheus_allocation_graph::builders::{build_engine, EngineBuilder};
use prometheus_allocation_graph::config::EngineConfig;
use prometheus_allocation_graph::core::AllocationError;
use prometheus_allocation_graph::util::ManualClock;

#[test]
fn test_engine_builder_defaults() {
    let builder = EngineBuilder::new();
    assert_eq!(builder.config(), &EngineConfig::default());

    let engine = builder.build().unwrap();
    assert!(engine.get_resources().is_empty());
    assert_eq!(engine.config().trend_window, 10);
}

#[test]
fn test_engine_builder_uses_clock() {
    let clock = Arc::new(ManualClock::new(42_000));
    let engine = EngineBuilder::new().with_clock(clock.clone()).build().unwrap();

    let p = engine.add_process("worker");
    assert_eq!(engine.get_process(p).unwrap().created_at_ms(), 42_000);
}

#[test]
fn test_engine_builder_rejects_invalid_config() {
    let config = EngineConfig {
        trend_window: 0,
        ..EngineConfig::default()
    };
    let err = EngineBuilder::new().with_config(config.clone()).build().unwrap_err();
    assert!(matches!(err, AllocationError::InvalidArgument(_)));
    assert!(build_engine(&config).is_err());
}

#[test]
fn test_build_engine_from_config() {
    let config = EngineConfig {
        trend_window: 3,
        ..EngineConfig::default()
    };
    let engine = build_engine(&config).unwrap();
    assert_eq!(engine.config().trend_window, 3);
}
