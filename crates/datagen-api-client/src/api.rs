//! Domain methods for the generation service.
//!
//! `POST /generate-csv` takes the schema as a multipart file plus the form
//! fields `num_records`, `interval`, `mode` and optionally `custom_filename`,
//! and answers `{ "message", "output_file" }`. `GET /download_csv/?filename=`
//! returns the generated file. Both endpoints may also answer 200 with
//! `{ "error": "..." }`, which is treated as a failure.

use async_trait::async_trait;
use bytes::Bytes;
use datagen_core::{
    ArtifactContent, GenerationBackend, GenerationRequest, GenerationResult, WorkflowError,
};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::{server_message, ApiClient, ClientError};

pub const GENERATE_PATH: &str = "/generate-csv";
pub const DOWNLOAD_PATH: &str = "/download_csv/";

/// Body of a generate response. Fields are optional here and checked after
/// deserialization so a missing one can be reported precisely.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCsvResponse {
    pub message: Option<String>,
    pub output_file: Option<String>,
    pub error: Option<String>,
}

impl GenerateCsvResponse {
    pub fn into_result(self) -> Result<GenerationResult, ClientError> {
        if let Some(error) = self.error {
            return Err(ClientError::Rejected(error));
        }
        let message = self
            .message
            .ok_or_else(|| ClientError::Malformed("missing field `message`".to_string()))?;
        let output_file = self
            .output_file
            .ok_or_else(|| ClientError::Malformed("missing field `output_file`".to_string()))?;

        Ok(GenerationResult {
            status_message: message,
            output_file_name: output_file,
        })
    }
}

impl ApiClient {
    /// Submit a generation request.
    pub async fn generate_csv(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ClientError> {
        let file = reqwest::multipart::Part::bytes(request.schema_blob.to_vec())
            .file_name(request.schema_file_name.clone());

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("num_records", request.record_count.clone())
            .text("interval", request.interval_minutes.clone())
            .text("mode", request.mode.as_str());
        if let Some(name) = &request.output_name {
            form = form.text("custom_filename", name.clone());
        }

        let body = self.post_multipart(GENERATE_PATH, form).await?;
        let response: GenerateCsvResponse = serde_json::from_value(body)
            .map_err(|e| ClientError::Malformed(format!("unexpected body: {}", e)))?;
        response.into_result()
    }

    /// Download a generated file by the name the service returned.
    pub async fn download_csv(&self, filename: &str) -> Result<Bytes, ClientError> {
        if filename.is_empty() {
            return Err(ClientError::EmptyFileName);
        }

        let response = self
            .get_raw(DOWNLOAD_PATH, &[("filename", filename)])
            .await?;
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let bytes = response.bytes().await?;
        if is_json {
            let text = String::from_utf8_lossy(&bytes);
            if let Some(message) = server_message(&text) {
                return Err(ClientError::Rejected(message));
            }
        }

        debug!(filename, bytes = bytes.len(), "Downloaded artifact");
        Ok(bytes)
    }
}

#[async_trait]
impl GenerationBackend for ApiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, WorkflowError> {
        self.generate_csv(request).await.map_err(|err| {
            debug!(error = %err, "Generate call failed");
            err.into_generation_error()
        })
    }

    async fn fetch(&self, output_file_name: &str) -> Result<ArtifactContent, WorkflowError> {
        self.download_csv(output_file_name)
            .await
            .map(ArtifactContent::new)
            .map_err(|err| {
                debug!(error = %err, "Fetch call failed");
                err.into_fetch_error()
            })
    }
}
