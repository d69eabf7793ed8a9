use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::bail;
use crate::error::{AlertsResult, ErrorKind};
use crate::push::listeners::PushEvent;
use crate::push::platform::PermissionState;
use crate::alerts_error;

/// Length of an uncompressed P-256 public key.
const VAPID_KEY_LEN: usize = 65;

/// Leading byte of an uncompressed elliptic curve point.
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

/// A browser push subscription in its standard JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPushSubscription {
    pub endpoint: String,
    pub expiration_time: Option<i64>,
    pub keys: WebPushKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebPushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Push capabilities of a browser with a service worker.
#[async_trait]
pub trait WebPushBridge: Send + Sync {
    fn has_service_worker(&self) -> bool;

    fn has_push_manager(&self) -> bool;

    /// Waits for the service worker registration to become active.
    async fn service_worker_ready(&self) -> AlertsResult<()>;

    async fn request_permission(&self) -> AlertsResult<PermissionState>;

    /// Subscribes with the push manager using the server's application key.
    async fn subscribe(&self, application_server_key: &[u8]) -> AlertsResult<WebPushSubscription>;

    /// Subscribes to notifications forwarded by the service worker.
    fn push_events(&self) -> broadcast::Receiver<PushEvent>;
}

/// Obtains web push subscriptions through a [`WebPushBridge`].
#[derive(Clone)]
pub struct WebRegistrar {
    bridge: Arc<dyn WebPushBridge>,
    vapid_public_key: String,
}

impl WebRegistrar {
    pub fn new(bridge: Arc<dyn WebPushBridge>, vapid_public_key: impl Into<String>) -> Self {
        Self {
            bridge,
            vapid_public_key: vapid_public_key.into(),
        }
    }

    pub fn push_events(&self) -> broadcast::Receiver<PushEvent> {
        self.bridge.push_events()
    }

    /// Subscribes the browser and returns the serialized subscription.
    pub async fn register(&self) -> AlertsResult<String> {
        if !self.bridge.has_service_worker() || !self.bridge.has_push_manager() {
            bail!(
                ErrorKind::PushUnsupported,
                "this browser does not support push notifications"
            );
        }

        self.bridge.service_worker_ready().await?;

        let permission = self.bridge.request_permission().await?;
        if !permission.is_granted() {
            bail!(
                ErrorKind::PermissionDenied,
                "push notification permission was not granted",
                format!("permission: {permission:?}")
            );
        }

        let key = decode_vapid_key(&self.vapid_public_key)?;
        let subscription = self.bridge.subscribe(&key).await?;

        let token = serde_json::to_string(&subscription).map_err(|err| {
            alerts_error!(
                ErrorKind::SerializationError,
                "failed to serialize push subscription",
                source: err
            )
        })?;

        info!(endpoint = %subscription.endpoint, "web push subscription created");

        Ok(token)
    }
}

/// Decodes a URL-safe base64 VAPID public key, padded or not.
pub fn decode_vapid_key(key: &str) -> AlertsResult<Vec<u8>> {
    let trimmed = key.trim().trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(trimmed).map_err(|err| {
        alerts_error!(
            ErrorKind::InvalidData,
            "VAPID public key is not valid base64",
            source: err
        )
    })?;

    if bytes.len() != VAPID_KEY_LEN || bytes[0] != UNCOMPRESSED_POINT_TAG {
        bail!(
            ErrorKind::InvalidData,
            "VAPID public key is not an uncompressed P-256 point",
            format!("decoded {} bytes", bytes.len())
        );
    }

    Ok(bytes)
}
