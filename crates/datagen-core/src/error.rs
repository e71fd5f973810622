//! Error types module
//!
//! Every failure in the generate/fetch/preview workflow is a `WorkflowError`.
//! None of them are fatal: the orchestrator turns each one into a single
//! user-visible status string and leaves the workflow in a state from which the
//! failed step can be triggered again. `ErrorMetadata` describes how.

use std::fmt;

/// Status shown when the service gave no message of its own.
pub const GENERIC_GENERATION_FAILURE: &str = "Error uploading file";
pub const GENERIC_FETCH_FAILURE: &str = "Error downloading file";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like missing input
    Debug,
    /// Warning level - for remote failures the user can retry
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Network stage of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generate,
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Generate => f.write_str("generate"),
            Stage::Fetch => f.write_str("fetch"),
        }
    }
}

/// Which step the user can re-trigger after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Submit the whole request again
    Resubmit,
    /// Fetch the already generated artifact again
    Fetch,
    /// Nothing to retry until the input changes
    None,
}

/// Metadata describing how an error is presented and recovered from.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "NO_SCHEMA_PROVIDED")
    fn error_code(&self) -> &'static str;

    /// Whether re-triggering the failed step can succeed without new input
    fn is_recoverable(&self) -> bool;

    /// Step to re-trigger
    fn retry_step(&self) -> RetryStep;

    /// User-visible status string
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("content is empty, no header row")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write CSV: {0}")]
    Write(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("No schema provided")]
    NoSchemaProvided,

    #[error("Generation failed: {message}")]
    Generation {
        message: String,
        status: Option<u16>,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No artifact available")]
    NoArtifactAvailable,

    #[error("Fetch failed: {message}")]
    Fetch {
        message: String,
        status: Option<u16>,
    },

    #[error("Preview parse error: {0}")]
    Parse(#[from] PreviewError),

    #[error("Download could not be initiated: {0}")]
    DownloadInitiation(String),

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("{stage} timed out")]
    TimedOut { stage: Stage },

    #[error("{stage} was cancelled")]
    Cancelled { stage: Stage },
}

impl WorkflowError {
    /// Generation failure with the server message, or the generic one when absent.
    pub fn generation(message: Option<String>, status: Option<u16>) -> Self {
        WorkflowError::Generation {
            message: non_blank(message).unwrap_or_else(|| GENERIC_GENERATION_FAILURE.to_string()),
            status,
        }
    }

    /// Fetch failure with the server message, or the generic one when absent.
    pub fn fetch(message: Option<String>, status: Option<u16>) -> Self {
        WorkflowError::Fetch {
            message: non_blank(message).unwrap_or_else(|| GENERIC_FETCH_FAILURE.to_string()),
            status,
        }
    }

    /// Network stage this error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkflowError::Generation { .. } | WorkflowError::MalformedResponse(_) => {
                Some(Stage::Generate)
            }
            WorkflowError::Fetch { .. } | WorkflowError::NoArtifactAvailable => Some(Stage::Fetch),
            WorkflowError::TimedOut { stage } | WorkflowError::Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

impl ErrorMetadata for WorkflowError {
    fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::NoSchemaProvided => "NO_SCHEMA_PROVIDED",
            WorkflowError::Generation { .. } => "GENERATION_ERROR",
            WorkflowError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            WorkflowError::NoArtifactAvailable => "NO_ARTIFACT_AVAILABLE",
            WorkflowError::Fetch { .. } => "FETCH_ERROR",
            WorkflowError::Parse(_) => "PARSE_ERROR",
            WorkflowError::DownloadInitiation(_) => "DOWNLOAD_INITIATION_ERROR",
            WorkflowError::SubmissionInFlight => "SUBMISSION_IN_FLIGHT",
            WorkflowError::TimedOut { .. } => "TIMED_OUT",
            WorkflowError::Cancelled { .. } => "CANCELLED",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self.retry_step(), RetryStep::None)
    }

    fn retry_step(&self) -> RetryStep {
        match self {
            WorkflowError::NoSchemaProvided | WorkflowError::NoArtifactAvailable => RetryStep::None,
            WorkflowError::Generation { .. } | WorkflowError::MalformedResponse(_) => {
                RetryStep::Resubmit
            }
            WorkflowError::Fetch { .. }
            | WorkflowError::Parse(_)
            | WorkflowError::DownloadInitiation(_) => RetryStep::Fetch,
            WorkflowError::TimedOut { stage } | WorkflowError::Cancelled { stage } => match stage {
                Stage::Generate => RetryStep::Resubmit,
                Stage::Fetch => RetryStep::Fetch,
            },
            // The in-flight run finishes on its own; nothing to re-trigger yet.
            WorkflowError::SubmissionInFlight => RetryStep::None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            WorkflowError::NoSchemaProvided => "Please upload or type a schema.".to_string(),
            WorkflowError::Generation { message, .. } => message.clone(),
            WorkflowError::MalformedResponse(_) => {
                "The generation service returned an unexpected response.".to_string()
            }
            WorkflowError::NoArtifactAvailable => "No file available for download.".to_string(),
            WorkflowError::Fetch { message, .. } => {
                if message == GENERIC_FETCH_FAILURE {
                    message.clone()
                } else {
                    format!("{}: {}", GENERIC_FETCH_FAILURE, message)
                }
            }
            WorkflowError::Parse(_) => "The generated file could not be previewed.".to_string(),
            WorkflowError::DownloadInitiation(_) => "Download could not be initiated.".to_string(),
            WorkflowError::SubmissionInFlight => {
                "A request is already in progress. Please wait for it to finish.".to_string()
            }
            WorkflowError::TimedOut { stage } => match stage {
                Stage::Generate => "Generation timed out.".to_string(),
                Stage::Fetch => "Download timed out.".to_string(),
            },
            WorkflowError::Cancelled { stage } => match stage {
                Stage::Generate => "Generation was cancelled.".to_string(),
                Stage::Fetch => "Download was cancelled.".to_string(),
            },
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            WorkflowError::NoSchemaProvided
            | WorkflowError::NoArtifactAvailable
            | WorkflowError::SubmissionInFlight
            | WorkflowError::Cancelled { .. } => LogLevel::Debug,
            WorkflowError::Generation { .. }
            | WorkflowError::Fetch { .. }
            | WorkflowError::TimedOut { .. }
            | WorkflowError::DownloadInitiation(_) => LogLevel::Warn,
            WorkflowError::MalformedResponse(_) | WorkflowError::Parse(_) => LogLevel::Error,
        }
    }
}

/// Cloneable snapshot of a `WorkflowError`, kept in the workflow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: &'static str,
    pub message: String,
    pub retry: RetryStep,
}

impl From<&WorkflowError> for Failure {
    fn from(err: &WorkflowError) -> Self {
        Failure {
            code: err.error_code(),
            message: err.client_message(),
            retry: err.retry_step(),
        }
    }
}
