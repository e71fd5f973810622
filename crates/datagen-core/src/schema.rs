//! Schema source resolution
//!
//! Non-empty typed text always wins over an uploaded file, no matter which was
//! set last. The one exception is text that was pre-filled from the upload and
//! left untouched: it is the same bytes, so the upload is used and keeps its
//! original file name.

use crate::error::WorkflowError;
use crate::models::{SchemaInput, UploadedSchema};

/// Pick the active schema source for a submission.
pub fn resolve_schema(
    typed_text: &str,
    upload: Option<&UploadedSchema>,
) -> Result<SchemaInput, WorkflowError> {
    if !typed_text.is_empty() {
        if let Some(upload) = upload {
            if upload.as_text() == Some(typed_text) {
                return Ok(SchemaInput::UploadedFile(upload.clone()));
            }
        }
        return Ok(SchemaInput::TypedText(typed_text.to_string()));
    }

    match upload {
        Some(upload) if !upload.bytes.is_empty() => Ok(SchemaInput::UploadedFile(upload.clone())),
        _ => Err(WorkflowError::NoSchemaProvided),
    }
}
