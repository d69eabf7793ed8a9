use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::badge::BadgeState;
use crate::concurrency::shutdown::ShutdownRx;
use crate::concurrency::signal::SignalRx;
use crate::notifications::aggregator::{NotificationFeed, aggregate};
use crate::notifications::source::NotificationSource;

/// Handle to a running [`Refresher`].
#[derive(Debug)]
pub struct RefresherHandle {
    join_handle: JoinHandle<()>,
}

impl RefresherHandle {
    pub async fn wait(self) {
        if let Err(err) = self.join_handle.await {
            error!(error = %err, "notification refresher task failed");
        }
    }
}

/// Keeps a [`NotificationFeed`] current.
///
/// Fetches once on start and again whenever the change signal fires; bursts of
/// signals collapse into one fetch. When the badge's `last_seen_at` moves, the current
/// feed is split again without fetching. A failed fetch keeps the last good feed.
pub struct Refresher {
    source: Arc<dyn NotificationSource>,
    change_rx: SignalRx,
    badge_rx: watch::Receiver<BadgeState>,
    feed_tx: watch::Sender<NotificationFeed>,
    shutdown_rx: ShutdownRx,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        change_rx: SignalRx,
        badge_rx: watch::Receiver<BadgeState>,
        shutdown_rx: ShutdownRx,
    ) -> (Self, watch::Receiver<NotificationFeed>) {
        let (feed_tx, feed_rx) = watch::channel(NotificationFeed::default());

        let refresher = Self {
            source,
            change_rx,
            badge_rx,
            feed_tx,
            shutdown_rx,
        };

        (refresher, feed_rx)
    }

    pub fn start(self) -> RefresherHandle {
        let join_handle = tokio::spawn(self.run());
        RefresherHandle { join_handle }
    }

    async fn run(mut self) {
        info!("starting notification refresher");

        self.refresh().await;

        let mut badge_open = true;
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait_for_shutdown() => break,
                changed = self.change_rx.changed() => {
                    if changed.is_err() {
                        debug!("change signal closed");
                        break;
                    }
                    self.refresh().await;
                }
                changed = self.badge_rx.changed(), if badge_open => {
                    if changed.is_err() {
                        badge_open = false;
                        continue;
                    }
                    self.repartition();
                }
            }
        }

        info!("notification refresher stopped");
    }

    async fn refresh(&mut self) {
        match self.source.fetch().await {
            Ok(snapshot) => {
                let last_seen_at = self.badge_rx.borrow_and_update().last_seen_at;
                let feed = aggregate(&snapshot.incidents, &snapshot.updates, last_seen_at);

                debug!(
                    unread = feed.unread_count(),
                    total = feed.len(),
                    "notification feed refreshed"
                );
                self.feed_tx.send_replace(feed);
            }
            Err(err) => {
                warn!(error = %err, "failed to refetch notifications, keeping previous feed");
            }
        }
    }

    fn repartition(&mut self) {
        let last_seen_at = self.badge_rx.borrow_and_update().last_seen_at;
        let feed = self.feed_tx.borrow().repartition(last_seen_at);

        if *self.feed_tx.borrow() != feed {
            self.feed_tx.send_replace(feed);
        }
    }
}
