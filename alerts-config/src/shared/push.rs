use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Push registration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// URL-safe base64 VAPID public key handed to the browser push manager.
    pub vapid_public_key: String,
    /// Upper bound on waiting for a native registration token.
    #[serde(default = "default_registration_timeout_ms")]
    pub registration_timeout_ms: u64,
}

const fn default_registration_timeout_ms() -> u64 {
    10_000
}

impl PushConfig {
    pub fn new(vapid_public_key: impl Into<String>) -> Self {
        Self {
            vapid_public_key: vapid_public_key.into(),
            registration_timeout_ms: default_registration_timeout_ms(),
        }
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.registration_timeout_ms == 0 {
            return Err(ValidationError::RegistrationTimeoutZero);
        }

        Ok(())
    }
}
