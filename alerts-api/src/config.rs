use alerts_config::Config;
use alerts_config::shared::{PgConnectionConfig, RateLimitConfig};
use serde::Deserialize;

/// Complete configuration for the alerts API service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Database holding the push subscribers.
    pub database: PgConnectionConfig,
    pub application: ApplicationSettings,
    /// Limits applied to every `/v1` request, per client address.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Config for ApiConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    /// Host address the API listens on.
    pub host: String,
    /// Port number the API listens on.
    pub port: u16,
}
