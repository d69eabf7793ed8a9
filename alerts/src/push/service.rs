use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AlertsError, AlertsResult, ErrorKind};
use crate::push::platform::Platform;
use crate::push::registrar::PushRegistrar;
use crate::push::store::SubscriberStore;
use crate::push::subscriber::{DeliveryScope, PushSubscriber};

/// Result of enabling push notifications for this device.
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Registered(PushSubscriber),
    /// No token could be obtained: permission denied, timed out, failed or unsupported.
    NoToken(ErrorKind),
    /// A token was obtained but the subscriber record could not be saved.
    PersistenceFailed(AlertsError),
    /// Anything else.
    Unknown(AlertsError),
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered(_))
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            RegistrationOutcome::Registered(_) => "Notifications are enabled.",
            RegistrationOutcome::NoToken(ErrorKind::PushUnsupported) => {
                "Push notifications are not supported on this device."
            }
            RegistrationOutcome::NoToken(_) => {
                "Notifications are blocked. Allow notifications for this app in your settings and try again."
            }
            RegistrationOutcome::PersistenceFailed(_) => {
                "Your notification settings could not be saved. Please try again."
            }
            RegistrationOutcome::Unknown(_) => {
                "An unknown error occurred while enabling notifications."
            }
        }
    }
}

/// Registers this device for push delivery and keeps its subscriber record current.
#[derive(Clone)]
pub struct PushService {
    registrar: PushRegistrar,
    store: Arc<dyn SubscriberStore>,
    device_id: Uuid,
    clock: Arc<dyn Clock>,
}

impl PushService {
    pub fn new(
        registrar: PushRegistrar,
        store: Arc<dyn SubscriberStore>,
        device_id: Uuid,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registrar,
            store,
            device_id,
            clock,
        }
    }

    pub fn platform(&self) -> Platform {
        self.registrar.platform()
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    pub fn registrar(&self) -> &PushRegistrar {
        &self.registrar
    }

    /// Returns the delivery token, or `None` on any failure.
    pub async fn register_push(&self) -> Option<String> {
        self.registrar.register_push().await
    }

    /// Obtains a token and upserts the subscriber record with `scope`.
    ///
    /// Never fails: every failure is reported through the outcome.
    pub async fn register(&self, scope: DeliveryScope) -> RegistrationOutcome {
        let token = match self.registrar.register().await {
            Ok(token) => token,
            Err(err) => {
                return match err.kind() {
                    kind @ (ErrorKind::PermissionDenied
                    | ErrorKind::RegistrationTimeout
                    | ErrorKind::RegistrationFailed
                    | ErrorKind::PushUnsupported) => {
                        info!(device_id = %self.device_id, error = %err, "push registration yielded no token");
                        RegistrationOutcome::NoToken(kind)
                    }
                    _ => {
                        warn!(device_id = %self.device_id, error = %err, "push registration failed unexpectedly");
                        RegistrationOutcome::Unknown(err)
                    }
                };
            }
        };

        let subscriber = PushSubscriber::new(
            self.device_id,
            self.platform(),
            token,
            scope,
            self.clock.utc_now(),
        );

        match self.store.upsert(&subscriber).await {
            Ok(stored) => {
                info!(device_id = %self.device_id, platform = %stored.platform, "push subscriber registered");
                RegistrationOutcome::Registered(stored)
            }
            Err(err) => {
                warn!(device_id = %self.device_id, error = %err, "failed to save push subscriber");
                RegistrationOutcome::PersistenceFailed(err)
            }
        }
    }

    /// Deactivates this device's subscriber record. Returns `false` if none existed.
    pub async fn unregister(&self) -> AlertsResult<bool> {
        let deactivated = self
            .store
            .deactivate(self.device_id, self.clock.utc_now())
            .await?;

        info!(device_id = %self.device_id, deactivated, "push subscriber unregistered");

        Ok(deactivated)
    }
}
