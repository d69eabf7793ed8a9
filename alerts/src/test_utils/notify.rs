use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

/// Default timeout for waiting on asynchronous state in tests.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits until the watched value satisfies `predicate` and returns it.
///
/// # Panics
///
/// Panics if the condition is not reached within [`DEFAULT_WAIT_TIMEOUT`] or the sender
/// is dropped first, so tests fail fast instead of hanging.
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    wait_for_with_timeout(rx, DEFAULT_WAIT_TIMEOUT, predicate).await
}

pub async fn wait_for_with_timeout<T, F>(
    rx: &mut watch::Receiver<T>,
    timeout_duration: Duration,
    predicate: F,
) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    match timeout(timeout_duration, rx.wait_for(predicate)).await {
        Ok(Ok(value)) => value.clone(),
        Ok(Err(_)) => panic!("watched sender dropped before the condition was reached"),
        Err(_) => panic!(
            "condition was not reached within {timeout_duration:?}. \
             Check whether the worker is running and the state is reachable."
        ),
    }
}
