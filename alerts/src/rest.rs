//! Minimal client for the Data Store's PostgREST interface.

use std::time::Duration;

use alerts_config::shared::DataStoreConfig;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{AlertsResult, ErrorKind};
use crate::alerts_error;

/// Timeout applied to every Data Store request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one Data Store project.
#[derive(Debug, Clone)]
pub struct DataStoreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl DataStoreClient {
    pub fn new(config: &DataStoreConfig) -> AlertsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| {
                alerts_error!(
                    ErrorKind::ConfigError,
                    "failed to build Data Store HTTP client",
                    source: err
                )
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    /// Starts an authenticated request against `table`.
    pub fn table(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{table}", self.base_url);
        let api_key = self.api_key.expose_secret();

        self.client
            .request(method, url)
            .header("apikey", api_key.as_str())
            .bearer_auth(api_key)
    }

    /// Sends the request and decodes a JSON response body.
    ///
    /// Non-success statuses become [`ErrorKind::PersistenceError`] carrying the status
    /// and body as detail.
    pub async fn send_json<T>(&self, request: RequestBuilder) -> AlertsResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_owned());
            error!(status = %status, body = %body, "data store request failed");

            return Err(alerts_error!(
                ErrorKind::PersistenceError,
                "Data Store rejected the request",
                format!("status {status}: {body}")
            ));
        }

        Ok(response.json().await?)
    }
}
