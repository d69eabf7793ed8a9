use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

/// A value that is resolved at most once by whichever producer gets there first.
///
/// Any number of producers may hold a reference and call [`Deferred::resolve`]; only the
/// first call delivers its value, later calls return `false` and drop theirs.
#[derive(Debug)]
pub struct Deferred<T> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Deferred<T> {
    /// Creates a deferred value and the receiver that observes its resolution.
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let deferred = Self {
            tx: Mutex::new(Some(tx)),
        };

        (deferred, rx)
    }

    /// Resolves with `value` if nothing resolved before. Returns whether this call won.
    pub fn resolve(&self, value: T) -> bool {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();

        match tx {
            // A dropped receiver still counts as resolved.
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
