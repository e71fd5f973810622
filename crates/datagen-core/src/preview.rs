//! Tabular preview parser
//!
//! Generated files are delimited text with a header row. Rows whose field
//! count differs from the header are skipped and reported as anomalies rather
//! than failing the whole preview.

use tracing::debug;

use crate::error::PreviewError;
use crate::models::{ArtifactContent, PreviewTable, RowAnomaly};

/// Parses artifact content into a `PreviewTable`.
#[derive(Debug, Clone, Copy)]
pub struct PreviewParser {
    delimiter: u8,
}

impl Default for PreviewParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl PreviewParser {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn parse(&self, content: &ArtifactContent) -> Result<PreviewTable, PreviewError> {
        let bytes = content.as_bytes();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(PreviewError::Empty);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        let mut anomalies = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.len() != headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                debug!(
                    line,
                    expected = headers.len(),
                    found = record.len(),
                    "Skipping malformed preview row"
                );
                anomalies.push(RowAnomaly {
                    line,
                    expected: headers.len(),
                    found: record.len(),
                });
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(PreviewTable {
            headers,
            rows,
            anomalies,
            delimiter: self.delimiter,
            crlf: bytes.windows(2).any(|w| w == b"\r\n"),
        })
    }
}

impl PreviewTable {
    /// Serialize back to delimited text with the same delimiter, header order
    /// and line terminator the content was parsed with. Skipped rows are not
    /// written.
    pub fn to_csv(&self) -> Result<Vec<u8>, PreviewError> {
        let terminator = if self.crlf {
            csv::Terminator::CRLF
        } else {
            csv::Terminator::Any(b'\n')
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(terminator)
            .from_writer(Vec::new());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| PreviewError::Write(e.error().to_string()))
    }
}
