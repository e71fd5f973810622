//! HTTP client for the data generation service.
//!
//! Provides a minimal client with optional auth (Bearer token or X-API-Key),
//! the two wire calls the workflow needs (generate, download by name) and a
//! `GenerationBackend` implementation on top of them.

pub mod api;
pub mod error;

use std::time::Duration;

use anyhow::{Context, Result};
use datagen_core::ClientConfig;
use reqwest::{Client, Response};
use serde_json::Value;

pub use api::GenerateCsvResponse;
pub use datagen_core::Auth;
pub use error::ClientError;

/// HTTP client for the generation service.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<Auth>,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Option<Auth>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.auth.clone(),
            config.http_timeout,
        )
    }

    /// Create client from environment: DATAGEN_API_URL (or API_URL) plus
    /// optional DATAGEN_API_TOKEN / DATAGEN_API_KEY.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            Some(Auth::XApiKey(key)) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    /// POST multipart form and return the JSON body of a 2xx response.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Value, ClientError> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).multipart(form));

        let response = request.send().await?;
        let response = ensure_success(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ClientError::Malformed(format!("response is not JSON: {}", e)))
    }

    /// GET with query parameters and return the raw response of a 2xx answer.
    pub async fn get_raw(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.get(&url));

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message: server_message(&error_text),
    })
}

/// Pull a human-readable message out of an error body: `error`, `detail` or
/// `message` from a JSON object, otherwise the trimmed text itself.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["error", "detail", "message"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}
