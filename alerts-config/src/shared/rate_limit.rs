use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Sliding window limits for a single limiter instance.
///
/// The values are fixed for the lifetime of the limiter; a new limiter must be built to
/// change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per identifier inside one window.
    pub max_requests: u32,
    /// Length of the trailing window in milliseconds.
    pub window_ms: u64,
    /// How often idle identifiers are evicted, in milliseconds.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

const fn default_sweep_interval_ms() -> u64 {
    5 * 60 * 1000
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_requests == 0 {
            return Err(ValidationError::MaxRequestsZero);
        }
        if self.window_ms == 0 {
            return Err(ValidationError::WindowZero);
        }
        if self.sweep_interval_ms == 0 {
            return Err(ValidationError::SweepIntervalZero);
        }

        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(10, 60_000)
    }
}
