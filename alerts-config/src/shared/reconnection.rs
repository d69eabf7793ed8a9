use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Backoff settings for re-establishing the change feed connection.
///
/// There is no retry limit: the listener keeps reconnecting until it is shut down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconnectionConfig {
    /// Delay before the first reconnection attempt.
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    /// Upper bound for the delay between attempts.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Factor applied to the delay after every failed attempt. Must be >= 1.0.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_retry_delay_ms() -> u64 {
    1_000
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl ReconnectionConfig {
    /// Returns the delay to wait before reconnection attempt number `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(63) as i32;
        let delay_ms = self.initial_retry_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_retry_delay_ms as f64);

        Duration::from_millis(capped_ms as u64)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backoff_multiplier < 1.0 {
            return Err(ValidationError::BackoffMultiplierTooSmall(
                self.backoff_multiplier,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt() {
        let config = ReconnectionConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(1_000));
        assert_eq!(config.backoff(1), Duration::from_millis(2_000));
        assert_eq!(config.backoff(2), Duration::from_millis(4_000));
        assert_eq!(config.backoff(4), Duration::from_millis(16_000));
    }

    #[test]
    fn backoff_caps_at_max() {
        let config = ReconnectionConfig::default();
        assert_eq!(config.backoff(5), Duration::from_millis(30_000));
        assert_eq!(config.backoff(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn validate_rejects_shrinking_backoff() {
        let config = ReconnectionConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::BackoffMultiplierTooSmall(0.5))
        );
    }
}
