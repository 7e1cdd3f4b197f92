//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_allocation_graph::config::{AdvisoryThresholds, EngineConfig};

#[test]
fn test_default_config_is_valid() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.trend_window, 10);
    assert!((config.thresholds.high_utilization_pct - 90.0).abs() < f64::EPSILON);
    assert!((config.thresholds.low_utilization_pct - 10.0).abs() < f64::EPSILON);
    assert!((config.thresholds.long_allocation_secs - 60.0).abs() < f64::EPSILON);
}

#[test]
fn test_config_invalid_trend_window() {
    let invalid = EngineConfig {
        trend_window: 0,
        thresholds: AdvisoryThresholds::default(),
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_threshold_order() {
    let invalid = EngineConfig {
        trend_window: 10,
        thresholds: AdvisoryThresholds {
            high_utilization_pct: 20.0,
            low_utilization_pct: 50.0,
            long_allocation_secs: 60.0,
        },
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_invalid_negative_duration() {
    let invalid = EngineConfig {
        trend_window: 10,
        thresholds: AdvisoryThresholds {
            long_allocation_secs: -1.0,
            ..AdvisoryThresholds::default()
        },
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "trend_window": 20,
        "thresholds": {
            "high_utilization_pct": 80.0
        }
    }"#;

    let config = EngineConfig::from_json_str(json).unwrap();
    assert_eq!(config.trend_window, 20);
    assert!((config.thresholds.high_utilization_pct - 80.0).abs() < f64::EPSILON);
    // Missing fields fall back to defaults.
    assert!((config.thresholds.low_utilization_pct - 10.0).abs() < f64::EPSILON);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(EngineConfig::from_json_str(r#"{"trend_window": 0}"#).is_err());
    assert!(EngineConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup_overrides() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("ALLOCATION_TREND_WINDOW", "5"),
        ("ALLOCATION_LONG_ALLOCATION_SECS", " 30.5 "),
    ]);
    let config = EngineConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();
    assert_eq!(config.trend_window, 5);
    assert!((config.thresholds.long_allocation_secs - 30.5).abs() < f64::EPSILON);
    assert!((config.thresholds.high_utilization_pct - 90.0).abs() < f64::EPSILON);
}

#[test]
fn test_config_from_lookup_rejects_garbage() {
    let result = EngineConfig::from_lookup(|key| {
        (key == "ALLOCATION_TREND_WINDOW").then(|| "many".to_string())
    });
    let err = result.unwrap_err();
    assert!(err.contains("ALLOCATION_TREND_WINDOW"));
}
