//! Fetched artifact content and the parsed preview table

use bytes::Bytes;

/// Raw bytes of a generated file. Consumers only ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContent {
    bytes: Bytes,
}

impl ArtifactContent {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A data row whose field count did not match the header. Skipped from the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAnomaly {
    /// 1-based line in the source content
    pub line: u64,
    pub expected: usize,
    pub found: usize,
}

/// Parsed tabular content: a header row plus one row per well-formed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTable {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<Vec<String>>,
    pub(crate) anomalies: Vec<RowAnomaly>,
    pub(crate) delimiter: u8,
    pub(crate) crlf: bool,
}

impl PreviewTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of a row in header order.
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Value of `column` in row `index`.
    pub fn value(&self, index: usize, column: &str) -> Option<&str> {
        let position = self.headers.iter().position(|h| h == column)?;
        self.rows
            .get(index)
            .and_then(|row| row.get(position))
            .map(String::as_str)
    }

    /// Row `index` as (header, value) pairs.
    pub fn record(&self, index: usize) -> Option<impl Iterator<Item = (&str, &str)>> {
        let row = self.rows.get(index)?;
        Some(
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str)),
        )
    }

    /// Rows that were skipped because their field count was wrong.
    pub fn anomalies(&self) -> &[RowAnomaly] {
        &self.anomalies
    }
}
