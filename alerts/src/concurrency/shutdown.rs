//! Broadcast shutdown for background workers.
//!
//! One [`ShutdownTx`] fans out to any number of [`ShutdownRx`] clones. Once shutdown is
//! requested it stays requested; late subscribers observe it immediately.

use tokio::sync::watch;

/// Sender half used to request shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Requests shutdown of every subscribed worker.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    /// Creates a new receiver for this channel.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver half observed by workers.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Completes when shutdown is requested or every sender has been dropped.
    pub async fn wait_for_shutdown(&mut self) {
        // An error means all senders are gone, which is treated as shutdown.
        let _ = self.0.wait_for(|shutdown| *shutdown).await;
    }
}

/// Creates a new shutdown channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}
