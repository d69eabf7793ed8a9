#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use alerts::push::{MemorySubscriberStore, SubscriberStore};
use alerts::rate_limit::RateLimiter;
use alerts_api::routes::subscribers::UpsertSubscriberRequest;
use alerts_api::startup::run;
use alerts_config::shared::RateLimitConfig;
use alerts_telemetry::tracing::init_test_tracing;
use reqwest::RequestBuilder;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub store: MemorySubscriberStore,
    server_handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestApp {
    /// Sends requests as if forwarded for `client_ip` by a proxy.
    fn from_client(&self, builder: RequestBuilder, client_ip: &str) -> RequestBuilder {
        builder.header("x-forwarded-for", client_ip)
    }

    pub async fn health_check(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/health_check", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn upsert_subscriber(
        &self,
        client_ip: &str,
        subscriber: &UpsertSubscriberRequest,
    ) -> reqwest::Response {
        self.from_client(
            self.api_client
                .post(format!("{}/v1/push/subscribers", &self.address)),
            client_ip,
        )
        .json(subscriber)
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn read_subscriber(&self, client_ip: &str, device_id: Uuid) -> reqwest::Response {
        self.from_client(
            self.api_client
                .get(format!("{}/v1/push/subscribers/{device_id}", &self.address)),
            client_ip,
        )
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn delete_subscriber(&self, client_ip: &str, device_id: Uuid) -> reqwest::Response {
        self.from_client(
            self.api_client
                .delete(format!("{}/v1/push/subscribers/{device_id}", &self.address)),
            client_ip,
        )
        .send()
        .await
        .expect("failed to execute request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_test_app_with_rate_limit(RateLimitConfig::new(1_000, 60_000)).await
}

pub async fn spawn_test_app_with_rate_limit(rate_limit: RateLimitConfig) -> TestApp {
    init_test_tracing();

    let base_address = "127.0.0.1";
    let listener =
        TcpListener::bind(format!("{base_address}:0")).expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = MemorySubscriberStore::new();
    let subscriber_store: Arc<dyn SubscriberStore> = Arc::new(store.clone());
    let limiter = Arc::new(RateLimiter::new(rate_limit).expect("invalid rate limit config"));

    let server = run(listener, subscriber_store, limiter)
        .await
        .expect("failed to bind address");
    let server_handle = tokio::spawn(server);

    TestApp {
        address: format!("http://{base_address}:{port}"),
        api_client: reqwest::Client::new(),
        store,
        server_handle,
    }
}
