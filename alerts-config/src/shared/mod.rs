//! Configuration structures shared by the alerts crates.

mod connection;
mod data_store;
mod push;
mod rate_limit;
mod realtime;
mod reconnection;

pub use connection::{PgConnectionConfig, TlsConfig};
pub use data_store::DataStoreConfig;
pub use push::PushConfig;
pub use rate_limit::RateLimitConfig;
pub use realtime::RealtimeConfig;
pub use reconnection::ReconnectionConfig;

use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("`max_requests` must be greater than zero")]
    MaxRequestsZero,
    #[error("`window_ms` must be greater than zero")]
    WindowZero,
    #[error("`sweep_interval_ms` must be greater than zero")]
    SweepIntervalZero,
    #[error("`registration_timeout_ms` must be greater than zero")]
    RegistrationTimeoutZero,
    #[error("`tables` must name at least one table to listen on")]
    NoRealtimeTables,
    #[error("`backoff_multiplier` must be at least 1.0, got {0}")]
    BackoffMultiplierTooSmall(f64),
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}
