use alerts::alerts_error;
use alerts::error::{AlertsError, AlertsResult, ErrorKind};
use alerts::push::{DeliveryScope, Platform, PushSubscriber, SubscriberStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubscribersDbError {
    #[error("Error while interacting with Postgres for push subscribers: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored platform `{0}` is not a known push platform")]
    UnknownPlatform(String),
}

impl From<SubscribersDbError> for AlertsError {
    fn from(err: SubscribersDbError) -> Self {
        match err {
            SubscribersDbError::Database(err) => alerts_error!(
                ErrorKind::PersistenceError,
                "push subscriber query failed",
                err.to_string(),
                source: err
            ),
            SubscribersDbError::UnknownPlatform(platform) => alerts_error!(
                ErrorKind::InvalidData,
                "stored push subscriber has an unknown platform",
                platform
            ),
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    device_id: Uuid,
    platform: String,
    push_token: String,
    push_aktiv: bool,
    sentral_ids: Vec<String>,
    fylke_ids: Vec<String>,
    kategori_ids: Vec<String>,
    #[sqlx(rename = "kun_pågående")]
    only_ongoing: bool,
    sist_aktiv: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for PushSubscriber {
    type Error = SubscribersDbError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let platform: Platform = row
            .platform
            .parse()
            .map_err(|_| SubscribersDbError::UnknownPlatform(row.platform.clone()))?;

        Ok(PushSubscriber {
            id: Some(row.id),
            device_id: row.device_id,
            platform,
            token: row.push_token,
            active: row.push_aktiv,
            scope: DeliveryScope {
                central_ids: row.sentral_ids,
                region_ids: row.fylke_ids,
                category_ids: row.kategori_ids,
                only_ongoing: row.only_ongoing,
            },
            last_active_at: row.sist_aktiv,
        })
    }
}

pub async fn upsert_subscriber<'c, E>(
    executor: E,
    subscriber: &PushSubscriber,
) -> Result<PushSubscriber, SubscribersDbError>
where
    E: PgExecutor<'c>,
{
    let row: SubscriberRow = sqlx::query_as(
        r#"
        insert into public.push_subscribers
            (device_id, platform, push_token, push_aktiv, sentral_ids, fylke_ids, kategori_ids, "kun_pågående", sist_aktiv)
        values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        on conflict (device_id) do update set
            platform = excluded.platform,
            push_token = excluded.push_token,
            push_aktiv = excluded.push_aktiv,
            sentral_ids = excluded.sentral_ids,
            fylke_ids = excluded.fylke_ids,
            kategori_ids = excluded.kategori_ids,
            "kun_pågående" = excluded."kun_pågående",
            sist_aktiv = excluded.sist_aktiv
        returning id, device_id, platform, push_token, push_aktiv, sentral_ids, fylke_ids, kategori_ids, "kun_pågående", sist_aktiv
        "#,
    )
    .bind(subscriber.device_id)
    .bind(subscriber.platform.as_str())
    .bind(&subscriber.token)
    .bind(subscriber.active)
    .bind(&subscriber.scope.central_ids)
    .bind(&subscriber.scope.region_ids)
    .bind(&subscriber.scope.category_ids)
    .bind(subscriber.scope.only_ongoing)
    .bind(subscriber.last_active_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

pub async fn read_subscriber<'c, E>(
    executor: E,
    device_id: Uuid,
) -> Result<Option<PushSubscriber>, SubscribersDbError>
where
    E: PgExecutor<'c>,
{
    let row: Option<SubscriberRow> = sqlx::query_as(
        r#"
        select id, device_id, platform, push_token, push_aktiv, sentral_ids, fylke_ids, kategori_ids, "kun_pågående", sist_aktiv
        from public.push_subscribers
        where device_id = $1
        "#,
    )
    .bind(device_id)
    .fetch_optional(executor)
    .await?;

    row.map(PushSubscriber::try_from).transpose()
}

/// Marks the subscriber inactive. Returns `false` if no subscriber exists for the device.
pub async fn deactivate_subscriber<'c, E>(
    executor: E,
    device_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, SubscribersDbError>
where
    E: PgExecutor<'c>,
{
    let result = sqlx::query(
        r#"
        update public.push_subscribers
        set push_aktiv = false, sist_aktiv = $2
        where device_id = $1
        "#,
    )
    .bind(device_id)
    .bind(at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// [`SubscriberStore`] backed by the API's Postgres database.
#[derive(Debug, Clone)]
pub struct PostgresSubscriberStore {
    pool: PgPool,
}

impl PostgresSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberStore for PostgresSubscriberStore {
    async fn upsert(&self, subscriber: &PushSubscriber) -> AlertsResult<PushSubscriber> {
        Ok(upsert_subscriber(&self.pool, subscriber).await?)
    }

    async fn deactivate(&self, device_id: Uuid, at: DateTime<Utc>) -> AlertsResult<bool> {
        Ok(deactivate_subscriber(&self.pool, device_id, at).await?)
    }

    async fn get(&self, device_id: Uuid) -> AlertsResult<Option<PushSubscriber>> {
        Ok(read_subscriber(&self.pool, device_id).await?)
    }
}
