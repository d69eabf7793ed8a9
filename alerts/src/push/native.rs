use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bail;
use crate::error::{AlertsResult, ErrorKind};
use crate::push::deferred::Deferred;
use crate::push::listeners::PushEvent;
use crate::push::platform::{PermissionState, Platform};

/// Outcome of a native registration request, delivered by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEvent {
    Registered { token: String },
    Failed { message: String },
}

/// Push capabilities of a native mobile shell.
#[async_trait]
pub trait NativePushBridge: Send + Sync {
    /// Platform of the shell, expected to be [`Platform::Ios`] or [`Platform::Android`].
    fn platform(&self) -> Platform;

    async fn check_permissions(&self) -> AlertsResult<PermissionState>;

    /// Prompts the user. Only called while the permission is undecided.
    async fn request_permissions(&self) -> AlertsResult<PermissionState>;

    /// Subscribes to registration outcomes. Outcomes are delivered asynchronously after
    /// [`NativePushBridge::register`] returns.
    fn registration_events(&self) -> broadcast::Receiver<RegistrationEvent>;

    /// Asks the OS push service for a device token.
    async fn register(&self) -> AlertsResult<()>;

    /// Subscribes to delivered notifications and notification interactions.
    fn push_events(&self) -> broadcast::Receiver<PushEvent>;
}

#[derive(Debug)]
enum TokenOutcome {
    Token(String),
    Failed(String),
    TimedOut,
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Obtains device tokens through a [`NativePushBridge`].
#[derive(Clone)]
pub struct NativeRegistrar {
    bridge: Arc<dyn NativePushBridge>,
    timeout: Duration,
}

impl NativeRegistrar {
    pub fn new(bridge: Arc<dyn NativePushBridge>, timeout: Duration) -> Self {
        Self { bridge, timeout }
    }

    pub fn platform(&self) -> Platform {
        self.bridge.platform()
    }

    pub fn push_events(&self) -> broadcast::Receiver<PushEvent> {
        self.bridge.push_events()
    }

    /// Requests permission if needed and waits for a device token.
    ///
    /// The token wait is bounded by the configured timeout. A success event, an error
    /// event, a failed registration call or the timeout resolve it, whichever happens
    /// first.
    pub async fn register(&self) -> AlertsResult<String> {
        self.ensure_permission().await?;

        let (deferred, outcome_rx) = Deferred::new();
        let deferred = Arc::new(deferred);

        // Subscribe before registering so an immediate outcome is not missed.
        let mut events = self.bridge.registration_events();
        let _listener = AbortOnDrop(tokio::spawn({
            let deferred = deferred.clone();
            async move {
                loop {
                    match events.recv().await {
                        Ok(RegistrationEvent::Registered { token }) => {
                            deferred.resolve(TokenOutcome::Token(token));
                            return;
                        }
                        Ok(RegistrationEvent::Failed { message }) => {
                            deferred.resolve(TokenOutcome::Failed(message));
                            return;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "registration listener lagged");
                        }
                        Err(RecvError::Closed) => {
                            deferred.resolve(TokenOutcome::Failed(
                                "registration events closed".to_owned(),
                            ));
                            return;
                        }
                    }
                }
            }
        }));

        let _timer = AbortOnDrop(tokio::spawn({
            let deferred = deferred.clone();
            let timeout = self.timeout;
            async move {
                tokio::time::sleep(timeout).await;
                deferred.resolve(TokenOutcome::TimedOut);
            }
        }));

        // The shell may never return from `register`, so the call races the outcome.
        let mut outcome_rx = outcome_rx;
        let early_outcome = tokio::select! {
            biased;
            outcome = &mut outcome_rx => Some(outcome),
            result = self.bridge.register() => {
                if let Err(err) = result {
                    deferred.resolve(TokenOutcome::Failed(err.to_string()));
                }
                None
            }
        };
        let outcome = match early_outcome {
            Some(outcome) => outcome,
            None => outcome_rx.await,
        };

        match outcome {
            Ok(TokenOutcome::Token(token)) => {
                info!(platform = %self.platform(), "native push token received");
                Ok(token)
            }
            Ok(TokenOutcome::Failed(message)) => {
                warn!(platform = %self.platform(), error = %message, "native push registration failed");
                bail!(
                    ErrorKind::RegistrationFailed,
                    "native push registration failed",
                    message
                );
            }
            Ok(TokenOutcome::TimedOut) => {
                warn!(
                    platform = %self.platform(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "native push registration timed out"
                );
                bail!(
                    ErrorKind::RegistrationTimeout,
                    "timed out waiting for a push token",
                    format!("waited {:?}", self.timeout)
                );
            }
            Err(_) => bail!(ErrorKind::Unknown, "push token result was dropped"),
        }
    }

    async fn ensure_permission(&self) -> AlertsResult<()> {
        let mut state = self.bridge.check_permissions().await?;
        if state == PermissionState::Prompt {
            state = self.bridge.request_permissions().await?;
        }

        if !state.is_granted() {
            bail!(
                ErrorKind::PermissionDenied,
                "push notification permission was not granted",
                format!("permission: {state:?}")
            );
        }

        Ok(())
    }
}
