//! Schema inputs: typed text or an uploaded file

use bytes::Bytes;

/// File name used for the schema payload when it comes from typed text.
pub const TYPED_SCHEMA_FILE_NAME: &str = "schema.json";

/// A schema file selected by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedSchema {
    /// Original file name, sent as-is in the multipart payload
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadedSchema {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// File contents as text, if they are valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// The schema source that wins for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaInput {
    TypedText(String),
    UploadedFile(UploadedSchema),
}

impl SchemaInput {
    /// Name the schema blob is sent under.
    pub fn file_name(&self) -> &str {
        match self {
            SchemaInput::TypedText(_) => TYPED_SCHEMA_FILE_NAME,
            SchemaInput::UploadedFile(upload) => &upload.file_name,
        }
    }

    /// Raw schema bytes.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            SchemaInput::TypedText(text) => Bytes::copy_from_slice(text.as_bytes()),
            SchemaInput::UploadedFile(upload) => upload.bytes.clone(),
        }
    }
}
