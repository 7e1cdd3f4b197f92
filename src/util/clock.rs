//! Time sources for history timestamps.
//!
//! All timestamps in the engine are milliseconds since the Unix epoch. The
//! engine never calls the system clock directly; it goes through a [`Clock`]
//! so tests and demos can drive time explicitly with [`ManualClock`].

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Returns 0 if the system clock reports a time before the epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Source of timestamps for the engine.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u128;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u128 {
        now_ms()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    current_ms: Mutex<u128>,
}

impl ManualClock {
    /// Create a clock frozen at `start_ms`.
    #[must_use]
    pub const fn new(start_ms: u128) -> Self {
        Self {
            current_ms: Mutex::new(start_ms),
        }
    }

    /// Move the clock forward by `delta_ms`.
    pub fn advance_ms(&self, delta_ms: u128) {
        let mut current = self.current_ms.lock();
        *current = current.saturating_add(delta_ms);
    }

    /// Move the clock forward by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(u128::from(secs) * 1000);
    }

    /// Pin the clock to an absolute timestamp.
    pub fn set_ms(&self, value_ms: u128) {
        *self.current_ms.lock() = value_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u128 {
        *self.current_ms.lock()
    }
}
