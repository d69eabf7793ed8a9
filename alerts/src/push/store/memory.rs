use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AlertsResult;
use crate::push::store::base::SubscriberStore;
use crate::push::subscriber::PushSubscriber;

/// In-memory [`SubscriberStore`]. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemorySubscriberStore {
    inner: Arc<Mutex<HashMap<Uuid, PushSubscriber>>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored record.
    pub async fn all(&self) -> Vec<PushSubscriber> {
        let inner = self.inner.lock().await;

        inner.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn upsert(&self, subscriber: &PushSubscriber) -> AlertsResult<PushSubscriber> {
        let mut inner = self.inner.lock().await;

        let id = inner
            .get(&subscriber.device_id)
            .and_then(|existing| existing.id)
            .unwrap_or_else(Uuid::new_v4);

        let stored = PushSubscriber {
            id: Some(id),
            ..subscriber.clone()
        };
        inner.insert(subscriber.device_id, stored.clone());

        Ok(stored)
    }

    async fn deactivate(&self, device_id: Uuid, at: DateTime<Utc>) -> AlertsResult<bool> {
        let mut inner = self.inner.lock().await;

        let Some(subscriber) = inner.get_mut(&device_id) else {
            return Ok(false);
        };
        subscriber.active = false;
        subscriber.last_active_at = at;

        Ok(true)
    }

    async fn get(&self, device_id: Uuid) -> AlertsResult<Option<PushSubscriber>> {
        let inner = self.inner.lock().await;

        Ok(inner.get(&device_id).cloned())
    }
}
