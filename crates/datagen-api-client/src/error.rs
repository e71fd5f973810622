//! Errors raised by the HTTP layer, before they are mapped onto the workflow
//! taxonomy.

use datagen_core::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {}", .message.as_deref().unwrap_or("Unknown error"))]
    Status { status: u16, message: Option<String> },

    /// The service answered 2xx but reported an error in the body.
    #[error("API rejected request: {0}")]
    Rejected(String),

    #[error("Unexpected response: {0}")]
    Malformed(String),

    #[error("No file name given")]
    EmptyFileName,
}

impl ClientError {
    /// Map a failure of the generate call.
    pub fn into_generation_error(self) -> WorkflowError {
        match self {
            ClientError::Transport(_) => WorkflowError::generation(None, None),
            ClientError::Status { status, message } => {
                WorkflowError::generation(message, Some(status))
            }
            ClientError::Rejected(message) => WorkflowError::generation(Some(message), None),
            ClientError::Malformed(detail) => WorkflowError::MalformedResponse(detail),
            ClientError::EmptyFileName => WorkflowError::NoArtifactAvailable,
        }
    }

    /// Map a failure of the fetch call.
    pub fn into_fetch_error(self) -> WorkflowError {
        match self {
            ClientError::Transport(_) => WorkflowError::fetch(None, None),
            ClientError::Status { status, message } => WorkflowError::fetch(message, Some(status)),
            ClientError::Rejected(message) | ClientError::Malformed(message) => {
                WorkflowError::fetch(Some(message), None)
            }
            ClientError::EmptyFileName => WorkflowError::NoArtifactAvailable,
        }
    }
}
