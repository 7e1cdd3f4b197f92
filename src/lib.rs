//! # Prometheus Allocation Graph
//!
//! An in-memory resource allocation graph engine with deadlock detection and
//! usage analytics.
//!
//! Processes hold and request discrete units of named resources. Every hold
//! and every pending request is mirrored as an edge of a directed graph:
//! `allocation` edges run resource → process, `request` edges run
//! process → resource. A cycle that alternates strictly between resources and
//! processes is a circular wait, i.e. a deadlock.
//!
//! ## Core Guarantees
//!
//! - **Unit accounting**: for every resource, `available + held == total` at
//!   every observable instant
//! - **Graph consistency**: an edge exists exactly when the matching holding or
//!   request exists in the entity maps
//! - **Atomic mutations**: a failed call returns one [`core::AllocationError`]
//!   and leaves no trace in entities, graph or history
//! - **Cascading removal**: removing a process releases and cancels everything
//!   it touched first, so no edge ever dangles
//! - **Reproducible queries**: deadlock and analytics reports are identical for
//!   identical state
//!
//! ## Quick Start
//!
//! ```rust
//! use prometheus_allocation_graph::core::AllocationEngine;
//!
//! let engine = AllocationEngine::new();
//! let r1 = engine.add_resource("printer", 1)?;
//! let r2 = engine.add_resource("scanner", 1)?;
//! let p1 = engine.add_process("p1");
//! let p2 = engine.add_process("p2");
//!
//! engine.allocate_one(p1, r1)?;
//! engine.allocate_one(p2, r2)?;
//! engine.request_one(p1, r2)?;
//! engine.request_one(p2, r1)?;
//!
//! let report = engine.detect_deadlock();
//! assert!(report.has_deadlock);
//! assert_eq!(report.affected_processes.len(), 2);
//! # Ok::<(), prometheus_allocation_graph::core::AllocationError>(())
//! ```
//!
//! ## Collaborators
//!
//! Web handlers, GUIs and CLIs can skip typed arguments entirely and go
//! through [`runtime::api::dispatch_json`]:
//!
//! ```rust
//! use prometheus_allocation_graph::core::AllocationEngine;
//! use prometheus_allocation_graph::runtime::dispatch_json;
//!
//! let engine = AllocationEngine::new();
//! let out = dispatch_json(&engine, r#"{"op":"add_resource","name":"gpu","total_units":4}"#)?;
//! assert!(out.contains("resource_added"));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! For complete examples, see:
//! - `tests/allocation_scenarios_test.rs` - Allocation, deadlock and cascade scenarios
//! - `tests/invariants_test.rs` - Randomized invariant checks

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Allocation state machine, graph model, deadlock detection and analytics.
pub mod core;
/// Configuration models for the engine and its advisory layer.
pub mod config;
/// Builders to construct engines from configuration.
pub mod builders;
/// Command surface for presentation-layer collaborators.
pub mod runtime;
/// Shared utilities.
pub mod util;
