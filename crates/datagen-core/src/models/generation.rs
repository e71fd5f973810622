//! Generation parameters, the outbound request and the service's answer

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECORD_COUNT: &str = "10";
pub const DEFAULT_INTERVAL_MINUTES: &str = "1";

/// Delivery mode understood by the generation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// One-shot generation of `record_count` records
    #[default]
    Batch,
    /// Server-side regeneration every `interval_minutes`
    Stream,
}

impl GenerationMode {
    /// Wire value for the `mode` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Batch => "batch",
            GenerationMode::Stream => "stream",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" => Ok(GenerationMode::Batch),
            "stream" => Ok(GenerationMode::Stream),
            other => Err(format!(
                "Invalid mode '{}'. Must be: batch or stream",
                other
            )),
        }
    }
}

/// Form values as the user entered them. Numeric fields stay raw text so that
/// empty or non-numeric input reaches the request builder untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParameters {
    pub record_count: String,
    pub interval_minutes: String,
    pub mode: GenerationMode,
    /// Optional server-side output name (`custom_filename`)
    pub output_name: Option<String>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            record_count: DEFAULT_RECORD_COUNT.to_string(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES.to_string(),
            mode: GenerationMode::Batch,
            output_name: None,
        }
    }
}

/// Numeric form field a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    RecordCount,
    IntervalMinutes,
}

impl ParameterField {
    /// Wire name of the field.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ParameterField::RecordCount => "num_records",
            ParameterField::IntervalMinutes => "interval",
        }
    }
}

/// A numeric field that was sent as entered but is not a positive integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterWarning {
    Empty { field: ParameterField },
    NotANumber { field: ParameterField, raw: String },
    NotPositive { field: ParameterField, raw: String },
}

impl ParameterWarning {
    pub fn field(&self) -> ParameterField {
        match self {
            ParameterWarning::Empty { field }
            | ParameterWarning::NotANumber { field, .. }
            | ParameterWarning::NotPositive { field, .. } => *field,
        }
    }
}

impl fmt::Display for ParameterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterWarning::Empty { field } => write!(f, "{} is empty", field.wire_name()),
            ParameterWarning::NotANumber { field, raw } => {
                write!(f, "{} is not a number: {:?}", field.wire_name(), raw)
            }
            ParameterWarning::NotPositive { field, raw } => {
                write!(f, "{} must be positive, got {:?}", field.wire_name(), raw)
            }
        }
    }
}

/// The multipart payload for one generate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub schema_file_name: String,
    pub schema_blob: Bytes,
    pub record_count: String,
    pub interval_minutes: String,
    pub mode: GenerationMode,
    pub output_name: Option<String>,
    /// Set when the request was built from invalid numeric input
    pub warnings: Vec<ParameterWarning>,
}

impl GenerationRequest {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Successful answer of the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub status_message: String,
    /// Opaque key for every later fetch
    pub output_file_name: String,
}
