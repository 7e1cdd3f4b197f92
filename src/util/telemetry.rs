//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "prometheus_allocation_graph=info";

/// Install an env-filtered fmt subscriber for engine logs.
///
/// Returns `false` when a global subscriber already exists, in which case
/// nothing changes. Embedders that bring their own subscriber never need this.
pub fn try_init_tracing() -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// [`try_init_tracing`], ignoring whether a subscriber was already set.
pub fn init_tracing() {
    let _ = try_init_tracing();
}
