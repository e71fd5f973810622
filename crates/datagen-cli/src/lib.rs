use std::fmt::Write;

use datagen_core::{PreviewTable, WorkflowOutcome};
use serde::Serialize;

const MAX_COLUMN_WIDTH: usize = 24;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render the header row and up to `max_rows` records as a fixed-width table.
pub fn render_preview(table: &PreviewTable, max_rows: usize) -> String {
    let mut out = String::new();

    if table.headers().is_empty() {
        out.push_str("No columns.\n");
        return out;
    }

    let widths: Vec<usize> = table
        .headers()
        .iter()
        .enumerate()
        .map(|(i, header)| {
            table
                .rows()
                .take(max_rows)
                .filter_map(|row| row.get(i))
                .map(|cell| one_line(cell).chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let _ = writeln!(out, "{}", format_line(table.headers().iter().map(String::as_str), &widths));
    let total_width = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(total_width));

    if table.is_empty() {
        out.push_str("\nNo rows.\n");
    }
    for row in table.rows().take(max_rows) {
        let _ = writeln!(out, "{}", format_line(row.iter().map(String::as_str), &widths));
    }

    if table.row_count() > max_rows {
        let _ = writeln!(
            out,
            "\n... ({} more rows, see the downloaded file)",
            table.row_count() - max_rows
        );
    }
    for anomaly in table.anomalies() {
        let _ = writeln!(
            out,
            "skipped line {}: expected {} fields, found {}",
            anomaly.line, anomaly.expected, anomaly.found
        );
    }

    out
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| {
            format!(
                "{:<width$}",
                truncate_string(&one_line(cell), *width),
                width = *width
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn one_line(cell: &str) -> String {
    cell.replace(['\r', '\n'], " ")
}

/// Machine-readable summary of a finished run.
#[derive(Debug, Serialize)]
pub struct OutcomeSummary {
    pub message: String,
    pub output_file: String,
    pub saved_to: Option<String>,
    pub download_error: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub skipped_rows: usize,
}

impl OutcomeSummary {
    pub fn new(outcome: &WorkflowOutcome, max_rows: usize) -> Self {
        Self {
            message: outcome.status_message.clone(),
            output_file: outcome.output_file_name.clone(),
            saved_to: outcome
                .saved_to
                .as_ref()
                .map(|p| p.display().to_string()),
            download_error: outcome
                .download_failure
                .as_ref()
                .map(|f| f.message.clone()),
            headers: outcome.preview.headers().to_vec(),
            rows: outcome
                .preview
                .rows()
                .take(max_rows)
                .map(<[String]>::to_vec)
                .collect(),
            total_rows: outcome.preview.row_count(),
            skipped_rows: outcome.preview.anomalies().len(),
        }
    }
}

/// Initialize tracing for the CLI. DATAGEN_LOG_FORMAT=json switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("DATAGEN_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
