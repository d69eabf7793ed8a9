use std::future::Future;

use crate::error::AlertsResult;

/// Key/value storage local to one installation.
///
/// Implementations should ensure thread-safety and handle concurrent access to the data.
pub trait LocalStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = AlertsResult<Option<String>>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = AlertsResult<()>> + Send;

    /// Removes `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> impl Future<Output = AlertsResult<()>> + Send;
}
