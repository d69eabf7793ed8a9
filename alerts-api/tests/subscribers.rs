use alerts::push::{Platform, SubscriberStore};
use alerts_api::routes::ErrorMessage;
use alerts_api::routes::subscribers::{ReadSubscriberResponse, UpsertSubscriberRequest};
use reqwest::StatusCode;
use uuid::Uuid;

use crate::support::test_app::spawn_test_app;

mod support;

const CLIENT: &str = "203.0.113.10";

fn new_subscriber(device_id: Uuid) -> UpsertSubscriberRequest {
    UpsertSubscriberRequest {
        device_id,
        platform: Platform::Android,
        push_token: "fcm-token-1".to_string(),
        sentral_ids: vec!["110-vest".to_string()],
        fylke_ids: vec![],
        kategori_ids: vec![],
        kun_pagaende: false,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_works() {
    let app = spawn_test_app().await;

    let response = app.health_check().await;

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn subscriber_can_be_registered_and_read() {
    let app = spawn_test_app().await;
    let device_id = Uuid::new_v4();

    let response = app
        .upsert_subscriber(CLIENT, &new_subscriber(device_id))
        .await;
    assert!(response.status().is_success());
    let created: ReadSubscriberResponse = response.json().await.unwrap();
    assert!(created.id.is_some());
    assert_eq!(created.device_id, device_id);
    assert!(created.push_aktiv);

    let response = app.read_subscriber(CLIENT, device_id).await;
    assert!(response.status().is_success());
    let read: serde_json::Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(read, {
        ".id" => "[id]",
        ".device_id" => "[device_id]",
        ".sist_aktiv" => "[timestamp]",
    }, @r#"
    {
      "device_id": "[device_id]",
      "fylke_ids": [],
      "id": "[id]",
      "kategori_ids": [],
      "kun_pågående": false,
      "platform": "android",
      "push_aktiv": true,
      "push_token": "fcm-token-1",
      "sentral_ids": [
        "110-vest"
      ],
      "sist_aktiv": "[timestamp]"
    }
    "#);
}

#[tokio::test(flavor = "multi_thread")]
async fn registering_the_same_device_twice_updates_one_record() {
    let app = spawn_test_app().await;
    let device_id = Uuid::new_v4();

    let first: ReadSubscriberResponse = app
        .upsert_subscriber(CLIENT, &new_subscriber(device_id))
        .await
        .json()
        .await
        .unwrap();

    let mut updated = new_subscriber(device_id);
    updated.push_token = "fcm-token-2".to_string();
    updated.kun_pagaende = true;
    let second: ReadSubscriberResponse = app
        .upsert_subscriber(CLIENT, &updated)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.push_token, "fcm-token-2");
    assert!(second.kun_pagaende);
    assert_eq!(app.store.all().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_push_token_is_rejected() {
    let app = spawn_test_app().await;
    let mut subscriber = new_subscriber(Uuid::new_v4());
    subscriber.push_token = "   ".to_string();

    let response = app.upsert_subscriber(CLIENT, &subscriber).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorMessage = response.json().await.unwrap();
    assert_eq!(error.error, "The push token must not be empty");
    assert!(app.store.all().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_subscriber_returns_not_found() {
    let app = spawn_test_app().await;
    let device_id = Uuid::new_v4();

    let response = app.read_subscriber(CLIENT, device_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorMessage = response.json().await.unwrap();
    assert_eq!(
        error.error,
        format!("The subscriber for device {device_id} was not found")
    );

    let response = app.delete_subscriber(CLIENT, device_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_subscriber_deactivates_it() {
    let app = spawn_test_app().await;
    let device_id = Uuid::new_v4();
    app.upsert_subscriber(CLIENT, &new_subscriber(device_id))
        .await;

    let response = app.delete_subscriber(CLIENT, device_id).await;
    assert!(response.status().is_success());

    let stored = app.store.get(device_id).await.unwrap().unwrap();
    assert!(!stored.active);

    let read: ReadSubscriberResponse = app
        .read_subscriber(CLIENT, device_id)
        .await
        .json()
        .await
        .unwrap();
    assert!(!read.push_aktiv);
}
