use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::badge::BadgeSynchronizer;
use crate::concurrency::shutdown::ShutdownRx;
use crate::storage::LocalStore;

/// A push notification as delivered to the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// The user acted on a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAction {
    pub action_id: String,
    pub notification: PushNotification,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Delivered while the app was in the foreground.
    Received(PushNotification),
    /// Tapped or otherwise acted upon.
    Action(PushAction),
}

/// Handle to the running push listeners.
#[derive(Debug)]
pub struct PushListenerHandle {
    join_handle: JoinHandle<()>,
}

impl PushListenerHandle {
    /// Waits until the event source closes or shutdown is requested.
    pub async fn wait(self) {
        if let Err(err) = self.join_handle.await {
            error!(error = %err, "push listener task failed");
        }
    }
}

/// Routes push events to the badge and the app callbacks.
///
/// Received notifications increment the badge before `on_received` runs; actions clear
/// it before `on_action` runs. Events are handled one at a time in delivery order.
pub fn setup_push_listeners<L, R, A>(
    mut events: broadcast::Receiver<PushEvent>,
    badge: Arc<BadgeSynchronizer<L>>,
    on_received: R,
    on_action: A,
    mut shutdown_rx: ShutdownRx,
) -> PushListenerHandle
where
    L: LocalStore + Send + Sync + 'static,
    R: Fn(PushNotification) + Send + Sync + 'static,
    A: Fn(PushAction) + Send + Sync + 'static,
{
    let join_handle = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;

                _ = shutdown_rx.wait_for_shutdown() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(PushEvent::Received(notification)) => {
                    let state = badge.increment().await;
                    debug!(unread_count = state.unread_count, "push notification received");
                    on_received(notification);
                }
                Ok(PushEvent::Action(action)) => {
                    badge.clear().await;
                    debug!(action_id = %action.action_id, "push notification action");
                    on_action(action);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push listener lagged, events were dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }

        debug!("push listeners stopped");
    });

    PushListenerHandle { join_handle }
}
