use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use alerts_config::shared::DataStoreConfig;
use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::Mutex;

use crate::bail;
use crate::error::{AlertsResult, ErrorKind};
use crate::notifications::records::{IncidentRecord, IncidentUpdateRecord};
use crate::rest::DataStoreClient;

pub const INCIDENTS_TABLE: &str = "incidents";

pub const INCIDENT_UPDATES_TABLE: &str = "incident_updates";

/// The records a feed is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSnapshot {
    pub incidents: Vec<IncidentRecord>,
    pub updates: Vec<IncidentUpdateRecord>,
}

/// Where notification records are refetched from.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch(&self) -> AlertsResult<NotificationSnapshot>;
}

/// [`NotificationSource`] reading the newest records from the Data Store.
#[derive(Debug, Clone)]
pub struct RestNotificationSource {
    client: DataStoreClient,
    limit: u32,
}

impl RestNotificationSource {
    pub fn new(client: DataStoreClient, config: &DataStoreConfig) -> Self {
        Self {
            client,
            limit: config.notifications_limit,
        }
    }

    async fn fetch_table<T>(&self, table: &str) -> AlertsResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = self.client.table(Method::GET, table).query(&[
            ("select", "*".to_owned()),
            ("order", "created_at.desc".to_owned()),
            ("limit", self.limit.to_string()),
        ]);

        self.client.send_json(request).await
    }
}

#[async_trait]
impl NotificationSource for RestNotificationSource {
    async fn fetch(&self) -> AlertsResult<NotificationSnapshot> {
        let (incidents, updates) = tokio::try_join!(
            self.fetch_table::<IncidentRecord>(INCIDENTS_TABLE),
            self.fetch_table::<IncidentUpdateRecord>(INCIDENT_UPDATES_TABLE),
        )?;

        Ok(NotificationSnapshot { incidents, updates })
    }
}

/// In-memory [`NotificationSource`]. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationSource {
    snapshot: Arc<Mutex<NotificationSnapshot>>,
    failing: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryNotificationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_incident(&self, incident: IncidentRecord) {
        self.snapshot.lock().await.incidents.push(incident);
    }

    pub async fn push_update(&self, update: IncidentUpdateRecord) {
        self.snapshot.lock().await.updates.push(update);
    }

    /// Makes subsequent fetches fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches served, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSource for MemoryNotificationSource {
    async fn fetch(&self) -> AlertsResult<NotificationSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            bail!(
                ErrorKind::PersistenceError,
                "notification source unavailable"
            );
        }

        Ok(self.snapshot.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::notifications::records::{IncidentStatus, Severity};

    #[tokio::test]
    async fn memory_source_serves_pushed_records_until_failing() {
        let source = MemoryNotificationSource::new();
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        source
            .push_incident(IncidentRecord {
                id: "inc-1".to_owned(),
                title: "Brann i bolighus".to_owned(),
                description: None,
                place: None,
                severity: Severity::High,
                status: IncidentStatus::Ongoing,
                central_id: None,
                region_id: None,
                category_id: None,
                created_at,
                updated_at: None,
            })
            .await;
        source
            .push_update(IncidentUpdateRecord {
                id: "upd-1".to_owned(),
                incident_id: "inc-1".to_owned(),
                message: "Brannen er slukket".to_owned(),
                created_at,
            })
            .await;

        let snapshot = source.fetch().await.unwrap();
        assert_eq!(snapshot.incidents.len(), 1);
        assert_eq!(snapshot.updates.len(), 1);
        assert_eq!(snapshot.updates[0].incident_id, "inc-1");

        source.set_failing(true);
        let err = source.fetch().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceError);
        assert_eq!(source.fetch_count(), 2);
    }
}
