use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::badge::synchronizer::{BadgeEvent, BadgeSynchronizer};
use crate::concurrency::shutdown::ShutdownRx;
use crate::storage::LocalStore;

/// App and page lifecycle transitions reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foreground,
    Background,
    VisibilityChanged { visible: bool },
}

impl LifecycleEvent {
    /// Returns the badge event this transition triggers, if any.
    pub fn badge_event(&self) -> Option<BadgeEvent> {
        match self {
            LifecycleEvent::Foreground => Some(BadgeEvent::AppForeground),
            LifecycleEvent::VisibilityChanged { visible: true } => Some(BadgeEvent::BecameVisible),
            LifecycleEvent::Background | LifecycleEvent::VisibilityChanged { visible: false } => {
                None
            }
        }
    }
}

/// Handle to a running lifecycle listener.
#[derive(Debug)]
pub struct LifecycleListenerHandle {
    join_handle: JoinHandle<()>,
}

impl LifecycleListenerHandle {
    /// Waits until the event stream ends or shutdown is requested.
    pub async fn wait(self) {
        if let Err(err) = self.join_handle.await {
            error!(error = %err, "lifecycle listener task failed");
        }
    }
}

/// Clears the badge whenever the app comes to the foreground or becomes visible.
pub fn spawn_lifecycle_listener<L, S>(
    events: S,
    badge: Arc<BadgeSynchronizer<L>>,
    mut shutdown_rx: ShutdownRx,
) -> LifecycleListenerHandle
where
    L: LocalStore + Send + Sync + 'static,
    S: Stream<Item = LifecycleEvent> + Send + 'static,
{
    let join_handle = tokio::spawn(async move {
        let mut events = Box::pin(events);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.wait_for_shutdown() => break,
                event = events.next() => {
                    let Some(event) = event else {
                        break;
                    };

                    if let Some(badge_event) = event.badge_event() {
                        badge.handle(badge_event).await;
                    }
                }
            }
        }

        debug!("lifecycle listener stopped");
    });

    LifecycleListenerHandle { join_handle }
}
