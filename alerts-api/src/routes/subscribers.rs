use actix_web::{
    HttpResponse, Responder, ResponseError, delete, get,
    http::{StatusCode, header::ContentType},
    post,
    web::{Data, Json, Path},
};
use alerts::error::AlertsError;
use alerts::push::{DeliveryScope, Platform, PushSubscriber, SubscriberStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::routes::ErrorMessage;

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("The subscriber for device {0} was not found")]
    SubscriberNotFound(Uuid),

    #[error("The push token must not be empty")]
    EmptyPushToken,

    #[error(transparent)]
    Store(#[from] AlertsError),
}

impl SubscriberError {
    pub fn to_message(&self) -> String {
        match self {
            // Do not expose store details in error messages
            SubscriberError::Store(_) => "internal server error".to_string(),
            e => e.to_string(),
        }
    }
}

impl ResponseError for SubscriberError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriberError::SubscriberNotFound(_) => StatusCode::NOT_FOUND,
            SubscriberError::EmptyPushToken => StatusCode::BAD_REQUEST,
            SubscriberError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_message = ErrorMessage {
            error: self.to_message(),
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(error_message)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertSubscriberRequest {
    #[schema(value_type = String, example = "6f1c3a52-6a55-4d2e-9a61-3f1f2b1d8c11", required = true)]
    pub device_id: Uuid,
    #[schema(value_type = String, example = "ios", required = true)]
    pub platform: Platform,
    #[schema(example = "f3c1...e9", required = true)]
    pub push_token: String,
    #[serde(default)]
    pub sentral_ids: Vec<String>,
    #[serde(default)]
    pub fylke_ids: Vec<String>,
    #[serde(default)]
    pub kategori_ids: Vec<String>,
    #[serde(rename = "kun_pågående", default)]
    pub kun_pagaende: bool,
}

impl UpsertSubscriberRequest {
    fn scope(&self) -> DeliveryScope {
        DeliveryScope {
            central_ids: self.sentral_ids.clone(),
            region_ids: self.fylke_ids.clone(),
            category_ids: self.kategori_ids.clone(),
            only_ongoing: self.kun_pagaende,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadSubscriberResponse {
    #[schema(value_type = Option<String>)]
    pub id: Option<Uuid>,
    #[schema(value_type = String)]
    pub device_id: Uuid,
    #[schema(value_type = String, example = "android")]
    pub platform: Platform,
    pub push_token: String,
    pub push_aktiv: bool,
    pub sentral_ids: Vec<String>,
    pub fylke_ids: Vec<String>,
    pub kategori_ids: Vec<String>,
    #[serde(rename = "kun_pågående")]
    pub kun_pagaende: bool,
    #[schema(value_type = String, format = DateTime)]
    pub sist_aktiv: DateTime<Utc>,
}

impl From<PushSubscriber> for ReadSubscriberResponse {
    fn from(subscriber: PushSubscriber) -> Self {
        Self {
            id: subscriber.id,
            device_id: subscriber.device_id,
            platform: subscriber.platform,
            push_token: subscriber.token,
            push_aktiv: subscriber.active,
            sentral_ids: subscriber.scope.central_ids,
            fylke_ids: subscriber.scope.region_ids,
            kategori_ids: subscriber.scope.category_ids,
            kun_pagaende: subscriber.scope.only_ongoing,
            sist_aktiv: subscriber.last_active_at,
        }
    }
}

#[utoipa::path(
    summary = "Register a push subscriber",
    description = "Creates or updates the subscriber identified by its device id.",
    request_body = UpsertSubscriberRequest,
    responses(
        (status = 200, description = "Subscriber stored", body = ReadSubscriberResponse),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 429, description = "Too many requests", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Subscribers"
)]
#[post("/push/subscribers")]
pub async fn upsert_subscriber(
    store: Data<dyn SubscriberStore>,
    subscriber: Json<UpsertSubscriberRequest>,
) -> Result<impl Responder, SubscriberError> {
    let request = subscriber.into_inner();
    let push_token = request.push_token.trim();
    if push_token.is_empty() {
        return Err(SubscriberError::EmptyPushToken);
    }

    let subscriber = PushSubscriber::new(
        request.device_id,
        request.platform,
        push_token,
        request.scope(),
        Utc::now(),
    );
    let stored = store.upsert(&subscriber).await?;

    info!(device_id = %stored.device_id, platform = %stored.platform, "push subscriber upserted");

    Ok(Json(ReadSubscriberResponse::from(stored)))
}

#[utoipa::path(
    summary = "Retrieve a push subscriber",
    description = "Returns the subscriber registered for a device.",
    params(
        ("device_id" = String, Path, description = "Device id of the subscriber")
    ),
    responses(
        (status = 200, description = "Subscriber retrieved", body = ReadSubscriberResponse),
        (status = 404, description = "Subscriber not found", body = ErrorMessage),
        (status = 429, description = "Too many requests", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Subscribers"
)]
#[get("/push/subscribers/{device_id}")]
pub async fn read_subscriber(
    store: Data<dyn SubscriberStore>,
    device_id: Path<Uuid>,
) -> Result<impl Responder, SubscriberError> {
    let device_id = device_id.into_inner();

    let response = store
        .get(device_id)
        .await?
        .map(ReadSubscriberResponse::from)
        .ok_or(SubscriberError::SubscriberNotFound(device_id))?;

    Ok(Json(response))
}

#[utoipa::path(
    summary = "Unregister a push subscriber",
    description = "Deactivates the subscriber for a device. The record is kept.",
    params(
        ("device_id" = String, Path, description = "Device id of the subscriber")
    ),
    responses(
        (status = 200, description = "Subscriber deactivated"),
        (status = 404, description = "Subscriber not found", body = ErrorMessage),
        (status = 429, description = "Too many requests", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Subscribers"
)]
#[delete("/push/subscribers/{device_id}")]
pub async fn delete_subscriber(
    store: Data<dyn SubscriberStore>,
    device_id: Path<Uuid>,
) -> Result<impl Responder, SubscriberError> {
    let device_id = device_id.into_inner();

    if !store.deactivate(device_id, Utc::now()).await? {
        return Err(SubscriberError::SubscriberNotFound(device_id));
    }

    info!(%device_id, "push subscriber deactivated");

    Ok(HttpResponse::Ok().finish())
}
