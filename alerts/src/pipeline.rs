use std::sync::Arc;

use alerts_config::shared::RealtimeConfig;
use tokio::sync::watch;
use tracing::info;

use crate::alerts_error;
use crate::badge::BadgeState;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::concurrency::signal::create_signal;
use crate::error::{AlertsResult, ErrorKind};
use crate::feed::{ChangeFeedHandle, ChangeFeedListener, SubscriptionState};
use crate::notifications::{NotificationFeed, NotificationSource, Refresher, RefresherHandle};

#[derive(Default)]
enum PipelineState {
    NotStarted {
        listener: ChangeFeedListener,
        refresher: Refresher,
    },
    Started {
        listener: ChangeFeedHandle,
        refresher: RefresherHandle,
    },
    #[default]
    Stopped,
}

/// Change feed and refresher wired together.
///
/// Row changes arrive through the [`ChangeFeedListener`], which signals the
/// [`Refresher`] to refetch and publish a new [`NotificationFeed`].
pub struct NotificationPipeline {
    state: PipelineState,
    shutdown_tx: ShutdownTx,
    feed_rx: watch::Receiver<NotificationFeed>,
    subscription_rx: watch::Receiver<SubscriptionState>,
}

impl NotificationPipeline {
    pub fn new(
        config: RealtimeConfig,
        source: Arc<dyn NotificationSource>,
        badge_rx: watch::Receiver<BadgeState>,
    ) -> AlertsResult<Self> {
        config.validate().map_err(|err| {
            alerts_error!(
                ErrorKind::ConfigError,
                "invalid Realtime configuration",
                err.to_string(),
                source: err
            )
        })?;

        let (shutdown_tx, _) = create_shutdown_channel();
        let (change_tx, change_rx) = create_signal();

        let listener = ChangeFeedListener::new(config, change_tx, shutdown_tx.subscribe());
        let (refresher, feed_rx) =
            Refresher::new(source, change_rx, badge_rx, shutdown_tx.subscribe());
        let subscription_rx = listener.state();

        Ok(Self {
            state: PipelineState::NotStarted {
                listener,
                refresher,
            },
            shutdown_tx,
            feed_rx,
            subscription_rx,
        })
    }

    /// Observes the latest notification feed.
    pub fn feed(&self) -> watch::Receiver<NotificationFeed> {
        self.feed_rx.clone()
    }

    pub fn subscription_state(&self) -> watch::Receiver<SubscriptionState> {
        self.subscription_rx.clone()
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Spawns the refresher and the listener. Starting twice is a no-op.
    pub fn start(&mut self) {
        if !matches!(self.state, PipelineState::NotStarted { .. }) {
            info!("notification pipeline already started");
            return;
        }

        let PipelineState::NotStarted {
            listener,
            refresher,
        } = std::mem::take(&mut self.state)
        else {
            return;
        };

        info!("starting notification pipeline");

        let refresher = refresher.start();
        let listener = listener.start();

        self.state = PipelineState::Started {
            listener,
            refresher,
        };
    }

    pub fn shutdown(&self) {
        info!("shutting down notification pipeline");
        self.shutdown_tx.shutdown();
    }

    /// Waits for both workers to stop.
    pub async fn wait(self) {
        let PipelineState::Started {
            listener,
            refresher,
        } = self.state
        else {
            info!("notification pipeline was not started, nothing to wait for");
            return;
        };

        listener.wait().await;
        refresher.wait().await;
    }

    pub async fn shutdown_and_wait(self) {
        self.shutdown();
        self.wait().await
    }
}
