//! Data generator client core
//!
//! Turns a schema (typed text or an uploaded file) and a few form fields into a
//! request for the remote generation service, then fetches the generated file,
//! saves it and parses it into a preview table. The HTTP side lives behind the
//! `GenerationBackend` trait; `datagen-api-client` provides the real one.

pub mod backend;
pub mod config;
pub mod download;
pub mod error;
pub mod models;
pub mod preview;
pub mod request;
pub mod schema;
pub mod workflow;

#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use backend::GenerationBackend;
pub use config::{Auth, ClientConfig};
pub use download::{DirectoryDownloader, DownloadTrigger};
pub use error::{
    ErrorMetadata, Failure, LogLevel, PreviewError, RetryStep, Stage, WorkflowError,
};
pub use models::{
    ArtifactContent, GenerationMode, GenerationParameters, GenerationRequest, GenerationResult,
    PreviewTable, SchemaInput, UploadedSchema,
};
pub use preview::PreviewParser;
pub use request::build_request;
pub use schema::resolve_schema;
pub use workflow::{
    SchemaForm, Workflow, WorkflowConfig, WorkflowHandle, WorkflowOutcome, WorkflowState,
};
