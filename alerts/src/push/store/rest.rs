use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::AlertsResult;
use crate::push::store::base::SubscriberStore;
use crate::push::subscriber::PushSubscriber;
use crate::rest::DataStoreClient;

/// Table holding push subscriber records.
pub const SUBSCRIBERS_TABLE: &str = "push_subscribers";

#[derive(Debug, Serialize)]
struct Deactivation {
    push_aktiv: bool,
    sist_aktiv: DateTime<Utc>,
}

/// [`SubscriberStore`] backed by the Data Store's REST interface.
///
/// Upserts rely on the unique constraint on `device_id` and merge duplicates, so
/// registering the same device twice updates one row.
#[derive(Debug, Clone)]
pub struct RestSubscriberStore {
    client: DataStoreClient,
}

impl RestSubscriberStore {
    pub fn new(client: DataStoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriberStore for RestSubscriberStore {
    async fn upsert(&self, subscriber: &PushSubscriber) -> AlertsResult<PushSubscriber> {
        let request = self
            .client
            .table(Method::POST, SUBSCRIBERS_TABLE)
            .query(&[("on_conflict", "device_id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(subscriber);

        let rows: Vec<PushSubscriber> = self.client.send_json(request).await?;
        debug!(device_id = %subscriber.device_id, "push subscriber upserted");

        Ok(rows
            .into_iter()
            .next()
            .unwrap_or_else(|| subscriber.clone()))
    }

    async fn deactivate(&self, device_id: Uuid, at: DateTime<Utc>) -> AlertsResult<bool> {
        let request = self
            .client
            .table(Method::PATCH, SUBSCRIBERS_TABLE)
            .query(&[("device_id", format!("eq.{device_id}"))])
            .header("Prefer", "return=representation")
            .json(&Deactivation {
                push_aktiv: false,
                sist_aktiv: at,
            });

        let rows: Vec<PushSubscriber> = self.client.send_json(request).await?;

        Ok(!rows.is_empty())
    }

    async fn get(&self, device_id: Uuid) -> AlertsResult<Option<PushSubscriber>> {
        let request = self
            .client
            .table(Method::GET, SUBSCRIBERS_TABLE)
            .query(&[
                ("select", "*".to_owned()),
                ("device_id", format!("eq.{device_id}")),
            ]);

        let rows: Vec<PushSubscriber> = self.client.send_json(request).await?;

        Ok(rows.into_iter().next())
    }
}
