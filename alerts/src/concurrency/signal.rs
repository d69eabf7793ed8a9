//! Payload-less signals used to wake workers.
//!
//! A signal only says that something changed. Receivers coalesce any number of sends
//! into a single wake-up, which is what the change feed relies on to turn bursts of
//! events into one refetch.

use tokio::sync::watch;

/// Transmitter side of a signal channel.
pub type SignalTx = watch::Sender<()>;

/// Receiver side of a signal channel.
pub type SignalRx = watch::Receiver<()>;

/// Creates a new signal channel.
///
/// The receiver starts with the current value marked as seen, so the first
/// [`watch::Receiver::changed`] call waits for an actual send.
pub fn create_signal() -> (SignalTx, SignalRx) {
    let (tx, mut rx) = watch::channel(());
    rx.mark_unchanged();
    (tx, rx)
}
