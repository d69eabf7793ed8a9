use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AlertsResult;
use crate::push::subscriber::PushSubscriber;

/// Storage of push subscribers keyed by device id.
///
/// Failures are reported as [`crate::error::ErrorKind::PersistenceError`].
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Inserts the subscriber or updates the existing record with the same device id.
    ///
    /// Returns the stored record, including its store-assigned `id`.
    async fn upsert(&self, subscriber: &PushSubscriber) -> AlertsResult<PushSubscriber>;

    /// Marks the device's subscription inactive without deleting it.
    ///
    /// Returns `false` if no record exists for the device.
    async fn deactivate(&self, device_id: Uuid, at: DateTime<Utc>) -> AlertsResult<bool>;

    async fn get(&self, device_id: Uuid) -> AlertsResult<Option<PushSubscriber>>;
}
