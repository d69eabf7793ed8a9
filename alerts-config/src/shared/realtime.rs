use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::{ReconnectionConfig, ValidationError};

/// Connection settings for the server-pushed change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, e.g. `wss://<project>.supabase.co/realtime/v1/websocket`.
    pub url: String,
    /// Key sent as the `apikey` query parameter and in the join payload.
    pub api_key: SecretString,
    /// Logical channel name joined for all table filters.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Database schema the table filters refer to.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Tables whose changes trigger a refetch.
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
}

fn default_channel() -> String {
    "incident-changes".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_tables() -> Vec<String> {
    vec!["incidents".to_string(), "incident_updates".to_string()]
}

const fn default_heartbeat_interval_ms() -> u64 {
    20_000
}

impl RealtimeConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: SecretString::new(api_key.into()),
            channel: default_channel(),
            schema: default_schema(),
            tables: default_tables(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            reconnection: ReconnectionConfig::default(),
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tables.is_empty() {
            return Err(ValidationError::NoRealtimeTables);
        }

        self.reconnection.validate()
    }
}
