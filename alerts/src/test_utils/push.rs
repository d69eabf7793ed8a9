use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::bail;
use crate::error::{AlertsResult, ErrorKind};
use crate::push::{
    NativePushBridge, PermissionState, Platform, PushEvent, RegistrationEvent, WebPushBridge,
    WebPushKeys, WebPushSubscription,
};

const EVENT_CAPACITY: usize = 16;

/// What a [`ScriptedNativeBridge`] does when asked to register.
#[derive(Debug, Clone)]
pub enum RegistrationScript {
    /// Emits these events, in order, during the register call.
    Events(Vec<RegistrationEvent>),
    /// Accepts the call and never reports an outcome.
    Silent,
    /// The register call never returns.
    Hang,
    /// The register call itself fails.
    FailCall(String),
}

impl RegistrationScript {
    pub fn token(token: &str) -> Self {
        Self::Events(vec![RegistrationEvent::Registered {
            token: token.to_owned(),
        }])
    }

    pub fn error(message: &str) -> Self {
        Self::Events(vec![RegistrationEvent::Failed {
            message: message.to_owned(),
        }])
    }
}

/// [`NativePushBridge`] driven by a fixed script.
#[derive(Debug)]
pub struct ScriptedNativeBridge {
    platform: Platform,
    permission: Mutex<PermissionState>,
    prompt_result: PermissionState,
    script: RegistrationScript,
    registration_tx: broadcast::Sender<RegistrationEvent>,
    push_tx: broadcast::Sender<PushEvent>,
    permission_requests: AtomicUsize,
    register_calls: AtomicUsize,
}

impl ScriptedNativeBridge {
    /// Permission granted, registration yields `device-token`.
    pub fn new(platform: Platform) -> Self {
        let (registration_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (push_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            platform,
            permission: Mutex::new(PermissionState::Granted),
            prompt_result: PermissionState::Granted,
            script: RegistrationScript::token("device-token"),
            registration_tx,
            push_tx,
            permission_requests: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_permission(self, permission: PermissionState) -> Self {
        *self.permission.lock().unwrap() = permission;
        self
    }

    /// Answer given when the user is prompted.
    pub fn with_prompt_result(mut self, result: PermissionState) -> Self {
        self.prompt_result = result;
        self
    }

    pub fn with_script(mut self, script: RegistrationScript) -> Self {
        self.script = script;
        self
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Delivers a push event to every subscriber. Returns how many received it.
    pub fn deliver(&self, event: PushEvent) -> usize {
        self.push_tx.send(event).unwrap_or(0)
    }
}

#[async_trait]
impl NativePushBridge for ScriptedNativeBridge {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn check_permissions(&self) -> AlertsResult<PermissionState> {
        Ok(*self.permission.lock().unwrap())
    }

    async fn request_permissions(&self) -> AlertsResult<PermissionState> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        *self.permission.lock().unwrap() = self.prompt_result;

        Ok(self.prompt_result)
    }

    fn registration_events(&self) -> broadcast::Receiver<RegistrationEvent> {
        self.registration_tx.subscribe()
    }

    async fn register(&self) -> AlertsResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);

        match &self.script {
            RegistrationScript::Events(events) => {
                for event in events {
                    let _ = self.registration_tx.send(event.clone());
                }
            }
            RegistrationScript::Silent => {}
            RegistrationScript::Hang => std::future::pending::<()>().await,
            RegistrationScript::FailCall(message) => {
                bail!(ErrorKind::RegistrationFailed, "register call failed", message.clone());
            }
        }

        Ok(())
    }

    fn push_events(&self) -> broadcast::Receiver<PushEvent> {
        self.push_tx.subscribe()
    }
}

/// [`WebPushBridge`] with configurable browser capabilities.
#[derive(Debug)]
pub struct ScriptedWebBridge {
    service_worker: bool,
    push_manager: bool,
    permission: PermissionState,
    subscription: WebPushSubscription,
    subscribed_keys: Mutex<Vec<Vec<u8>>>,
    push_tx: broadcast::Sender<PushEvent>,
}

impl ScriptedWebBridge {
    /// A capable browser where the user grants permission.
    pub fn new() -> Self {
        let (push_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            service_worker: true,
            push_manager: true,
            permission: PermissionState::Granted,
            subscription: WebPushSubscription {
                endpoint: "https://push.example.test/send/abc".to_owned(),
                expiration_time: None,
                keys: WebPushKeys {
                    p256dh: "client-public-key".to_owned(),
                    auth: "client-auth".to_owned(),
                },
            },
            subscribed_keys: Mutex::new(Vec::new()),
            push_tx,
        }
    }

    pub fn without_service_worker(mut self) -> Self {
        self.service_worker = false;
        self
    }

    pub fn without_push_manager(mut self) -> Self {
        self.push_manager = false;
        self
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = permission;
        self
    }

    pub fn subscription(&self) -> &WebPushSubscription {
        &self.subscription
    }

    /// Application server keys passed to each subscribe call.
    pub fn subscribed_keys(&self) -> Vec<Vec<u8>> {
        self.subscribed_keys.lock().unwrap().clone()
    }

    pub fn deliver(&self, event: PushEvent) -> usize {
        self.push_tx.send(event).unwrap_or(0)
    }
}

impl Default for ScriptedWebBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebPushBridge for ScriptedWebBridge {
    fn has_service_worker(&self) -> bool {
        self.service_worker
    }

    fn has_push_manager(&self) -> bool {
        self.push_manager
    }

    async fn service_worker_ready(&self) -> AlertsResult<()> {
        Ok(())
    }

    async fn request_permission(&self) -> AlertsResult<PermissionState> {
        Ok(self.permission)
    }

    async fn subscribe(&self, application_server_key: &[u8]) -> AlertsResult<WebPushSubscription> {
        self.subscribed_keys
            .lock()
            .unwrap()
            .push(application_server_key.to_vec());

        Ok(self.subscription.clone())
    }

    fn push_events(&self) -> broadcast::Receiver<PushEvent> {
        self.push_tx.subscribe()
    }
}

/// A valid VAPID public key, URL-safe base64 without padding.
pub fn test_vapid_key() -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let mut key = vec![0x04];
    key.extend(1..65u8);
    URL_SAFE_NO_PAD.encode(key)
}
