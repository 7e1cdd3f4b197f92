//! Engine configuration structures.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`EngineConfig::trend_window`].
pub const ENV_TREND_WINDOW: &str = "ALLOCATION_TREND_WINDOW";
/// Environment variable overriding [`AdvisoryThresholds::high_utilization_pct`].
pub const ENV_HIGH_UTILIZATION_PCT: &str = "ALLOCATION_HIGH_UTILIZATION_PCT";
/// Environment variable overriding [`AdvisoryThresholds::low_utilization_pct`].
pub const ENV_LOW_UTILIZATION_PCT: &str = "ALLOCATION_LOW_UTILIZATION_PCT";
/// Environment variable overriding [`AdvisoryThresholds::long_allocation_secs`].
pub const ENV_LONG_ALLOCATION_SECS: &str = "ALLOCATION_LONG_ALLOCATION_SECS";

/// Thresholds that turn usage figures into suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryThresholds {
    /// Usage above this percentage suggests adding units.
    pub high_utilization_pct: f64,
    /// Usage below this percentage suggests removing units.
    pub low_utilization_pct: f64,
    /// Mean hold time above this many seconds suggests optimizing usage.
    pub long_allocation_secs: f64,
}

impl Default for AdvisoryThresholds {
    fn default() -> Self {
        Self {
            high_utilization_pct: 90.0,
            low_utilization_pct: 10.0,
            long_allocation_secs: 60.0,
        }
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of most recent history entries in the activity trend.
    pub trend_window: usize,
    /// Suggestion thresholds.
    pub thresholds: AdvisoryThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trend_window: 10,
            thresholds: AdvisoryThresholds::default(),
        }
    }
}

impl AdvisoryThresholds {
    /// Validate threshold values.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("high_utilization_pct", self.high_utilization_pct),
            ("low_utilization_pct", self.low_utilization_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{name} must be within 0..=100, got {value}"));
            }
        }
        if self.low_utilization_pct >= self.high_utilization_pct {
            return Err("low_utilization_pct must be below high_utilization_pct".into());
        }
        if !self.long_allocation_secs.is_finite() || self.long_allocation_secs < 0.0 {
            return Err("long_allocation_secs must be a non-negative number".into());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Validate all values.
    pub fn validate(&self) -> Result<(), String> {
        if self.trend_window == 0 {
            return Err("trend_window must be greater than 0".into());
        }
        self.thresholds
            .validate()
            .map_err(|e| format!("thresholds invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the environment, loading a `.env` file first
    /// if one exists. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(window) = parse_var(&lookup, ENV_TREND_WINDOW)? {
            cfg.trend_window = window;
        }
        if let Some(pct) = parse_var(&lookup, ENV_HIGH_UTILIZATION_PCT)? {
            cfg.thresholds.high_utilization_pct = pct;
        }
        if let Some(pct) = parse_var(&lookup, ENV_LOW_UTILIZATION_PCT)? {
            cfg.thresholds.low_utilization_pct = pct;
        }
        if let Some(secs) = parse_var(&lookup, ENV_LONG_ALLOCATION_SECS)? {
            cfg.thresholds.long_allocation_secs = secs;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{key}: cannot parse `{raw}`: {e}"))
        })
        .transpose()
}
