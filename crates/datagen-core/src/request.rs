//! Generation request builder
//!
//! Numeric fields are passed through exactly as entered. Invalid values are
//! not corrected: they are recorded as warnings on the request so the caller
//! can tell a degraded request apart from a clean one, and the service gets
//! the final say.

use crate::models::{
    GenerationMode, GenerationParameters, GenerationRequest, ParameterField, ParameterWarning,
    SchemaInput,
};

/// Assemble the outbound payload for one submission.
///
/// `interval_minutes` is always included; the service ignores it in batch mode.
pub fn build_request(input: &SchemaInput, params: &GenerationParameters) -> GenerationRequest {
    let mut warnings = Vec::new();
    if let Some(warning) = check_positive(ParameterField::RecordCount, &params.record_count) {
        warnings.push(warning);
    }
    if params.mode == GenerationMode::Stream {
        if let Some(warning) =
            check_positive(ParameterField::IntervalMinutes, &params.interval_minutes)
        {
            warnings.push(warning);
        }
    }

    let output_name = params
        .output_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    GenerationRequest {
        schema_file_name: input.file_name().to_string(),
        schema_blob: input.to_bytes(),
        record_count: params.record_count.clone(),
        interval_minutes: params.interval_minutes.clone(),
        mode: params.mode,
        output_name,
        warnings,
    }
}

fn check_positive(field: ParameterField, raw: &str) -> Option<ParameterWarning> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(ParameterWarning::Empty { field });
    }
    match trimmed.parse::<i64>() {
        Ok(value) if value > 0 => None,
        Ok(_) => Some(ParameterWarning::NotPositive {
            field,
            raw: raw.to_string(),
        }),
        Err(_) => Some(ParameterWarning::NotANumber {
            field,
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadedSchema;

    fn params(records: &str, interval: &str, mode: GenerationMode) -> GenerationParameters {
        GenerationParameters {
            record_count: records.to_string(),
            interval_minutes: interval.to_string(),
            mode,
            output_name: None,
        }
    }

    #[test]
    fn typed_text_becomes_schema_json() {
        let input = SchemaInput::TypedText(r#"{"fields":["a","b"]}"#.to_string());
        let request = build_request(&input, &params("5", "1", GenerationMode::Batch));

        assert_eq!(request.schema_file_name, "schema.json");
        assert_eq!(&request.schema_blob[..], br#"{"fields":["a","b"]}"#);
        assert_eq!(request.record_count, "5");
        assert_eq!(request.interval_minutes, "1");
        assert!(!request.is_degraded());
    }

    #[test]
    fn upload_keeps_original_name_and_bytes() {
        let input = SchemaInput::UploadedFile(UploadedSchema::new("users.json", vec![1, 2, 3]));
        let request = build_request(&input, &params("5", "1", GenerationMode::Batch));
        assert_eq!(request.schema_file_name, "users.json");
        assert_eq!(&request.schema_blob[..], &[1, 2, 3]);
    }

    #[test]
    fn invalid_numbers_pass_through_with_warnings() {
        let input = SchemaInput::TypedText("{}".to_string());
        let request = build_request(&input, &params("", "abc", GenerationMode::Stream));

        assert_eq!(request.record_count, "");
        assert_eq!(request.interval_minutes, "abc");
        assert_eq!(
            request.warnings,
            vec![
                ParameterWarning::Empty {
                    field: ParameterField::RecordCount
                },
                ParameterWarning::NotANumber {
                    field: ParameterField::IntervalMinutes,
                    raw: "abc".to_string()
                },
            ]
        );
    }

    #[test]
    fn interval_only_checked_in_stream_mode() {
        let input = SchemaInput::TypedText("{}".to_string());
        let batch = build_request(&input, &params("3", "0", GenerationMode::Batch));
        assert!(batch.warnings.is_empty());
        assert_eq!(batch.interval_minutes, "0");

        let stream = build_request(&input, &params("3", "0", GenerationMode::Stream));
        assert_eq!(
            stream.warnings,
            vec![ParameterWarning::NotPositive {
                field: ParameterField::IntervalMinutes,
                raw: "0".to_string()
            }]
        );
    }

    #[test]
    fn blank_output_name_is_dropped() {
        let input = SchemaInput::TypedText("{}".to_string());
        let mut p = params("3", "1", GenerationMode::Batch);
        p.output_name = Some("  ".to_string());
        assert_eq!(build_request(&input, &p).output_name, None);

        p.output_name = Some(" users ".to_string());
        assert_eq!(
            build_request(&input, &p).output_name.as_deref(),
            Some("users")
        );
    }
}
