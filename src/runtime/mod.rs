//! Command surface for presentation-layer collaborators.

pub mod api;

pub use api::{dispatch, dispatch_json, health, Command, ErrorBody, Health, Response};
