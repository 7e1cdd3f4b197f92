//! Builder that assembles an [`AllocationEngine`] from configuration and a clock.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{AllocationEngine, AllocationError};
use crate::util::clock::{Clock, SystemClock};

/// Step-wise engine construction.
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Start from the default configuration and the wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the clock, e.g. with a [`crate::util::ManualClock`] in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration that will be used.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the configuration and build the engine.
    ///
    /// # Errors
    /// `InvalidArgument` if the configuration fails validation.
    pub fn build(self) -> Result<AllocationEngine, AllocationError> {
        self.config
            .validate()
            .map_err(|e| AllocationError::InvalidArgument(format!("config invalid: {e}")))?;
        tracing::debug!(config = ?self.config, "building allocation engine");
        Ok(AllocationEngine::with_parts(self.config, self.clock))
    }
}

/// Build an engine from configuration with the wall clock.
///
/// # Errors
/// `InvalidArgument` if the configuration fails validation.
pub fn build_engine(cfg: &EngineConfig) -> Result<AllocationEngine, AllocationError> {
    EngineBuilder::new().with_config(cfg.clone()).build()
}
