//! Configuration models for the engine and its advisory layer.

pub mod engine;

pub use engine::{AdvisoryThresholds, EngineConfig};
