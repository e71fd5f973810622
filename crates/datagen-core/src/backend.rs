//! The seam between the workflow and the remote generation service.

use async_trait::async_trait;

use crate::error::WorkflowError;
use crate::models::{ArtifactContent, GenerationRequest, GenerationResult};

/// Remote generation service: one call to generate, one to fetch by name.
///
/// Implementations perform exactly one outbound call per invocation and never
/// retry on their own.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a request. Fails with `Generation` or `MalformedResponse`.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResult, WorkflowError>;

    /// Fetch a generated artifact. An empty name fails with
    /// `NoArtifactAvailable` before any network call.
    async fn fetch(&self, output_file_name: &str) -> Result<ArtifactContent, WorkflowError>;
}
