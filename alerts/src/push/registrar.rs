use std::sync::Arc;

use alerts_config::shared::PushConfig;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::bail;
use crate::error::{AlertsResult, ErrorKind};
use crate::push::listeners::PushEvent;
use crate::push::native::{NativePushBridge, NativeRegistrar};
use crate::push::platform::{Platform, detect_platform};
use crate::push::web::{WebPushBridge, WebRegistrar};

/// Push integrations offered by the host the app runs in.
#[derive(Clone, Default)]
pub struct PushHost {
    pub native: Option<Arc<dyn NativePushBridge>>,
    pub web: Option<Arc<dyn WebPushBridge>>,
}

/// Obtains a delivery token on the platform selected at startup.
#[derive(Clone)]
pub enum PushRegistrar {
    Native(NativeRegistrar),
    Web(WebRegistrar),
}

impl PushRegistrar {
    /// Detects the platform from `host` and builds the matching registrar.
    pub fn select(host: PushHost, config: &PushConfig) -> AlertsResult<Self> {
        let platform = detect_platform(
            host.native
                .as_ref()
                .map(|bridge| bridge.platform().as_str()),
        );

        let registrar = match (platform.is_native(), host.native, host.web) {
            (true, Some(native), _) => PushRegistrar::Native(NativeRegistrar::new(
                native,
                config.registration_timeout(),
            )),
            (false, _, Some(web)) => {
                PushRegistrar::Web(WebRegistrar::new(web, config.vapid_public_key.clone()))
            }
            _ => bail!(
                ErrorKind::PushUnsupported,
                "no push integration available on this host"
            ),
        };

        info!(platform = %registrar.platform(), "push registrar selected");

        Ok(registrar)
    }

    pub fn platform(&self) -> Platform {
        match self {
            PushRegistrar::Native(native) => native.platform(),
            PushRegistrar::Web(_) => Platform::Web,
        }
    }

    /// Returns the delivery token or the reason none could be obtained.
    pub async fn register(&self) -> AlertsResult<String> {
        match self {
            PushRegistrar::Native(native) => native.register().await,
            PushRegistrar::Web(web) => web.register().await,
        }
    }

    /// Returns the delivery token, or `None` on any failure.
    pub async fn register_push(&self) -> Option<String> {
        match self.register().await {
            Ok(token) => Some(token),
            Err(err) => {
                warn!(platform = %self.platform(), error = %err, "push registration yielded no token");
                None
            }
        }
    }

    pub fn push_events(&self) -> broadcast::Receiver<PushEvent> {
        match self {
            PushRegistrar::Native(native) => native.push_events(),
            PushRegistrar::Web(web) => web.push_events(),
        }
    }
}
