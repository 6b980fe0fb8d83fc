//! Record export
//!
//! Serializes a record snapshot to CSV, Excel or PDF. Every exporter writes
//! synchronously and reports failure through a single [`ExportError`] that
//! carries the underlying message.

pub mod exporter_csv;
pub mod exporter_pdf;
pub mod exporter_xlsx;

pub use exporter_csv::{export_csv, export_csv_to_file};
pub use exporter_pdf::{export_pdf_to_file, paginate, PdfLine, PdfPage};
pub use exporter_xlsx::export_xlsx_to_file;

use chrono::{DateTime, Local};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::datalog::{ExportFormat, Record};

/// Errors that can occur while exporting records
#[derive(Error, Debug)]
pub enum ExportError {
    /// The writer for `format` failed
    #[error("{format} export failed: {message}")]
    Failed {
        /// Format being written
        format: ExportFormat,
        /// Underlying cause
        message: String,
    },

    /// The file extension maps to no format
    #[error("Unsupported export file type: {0}")]
    UnsupportedFormat(String),
}

impl ExportError {
    pub(crate) fn failed(format: ExportFormat, err: impl std::fmt::Display) -> Self {
        ExportError::Failed {
            format,
            message: err.to_string(),
        }
    }
}

/// Write `records` to `path` in the given format
pub fn export<P: AsRef<Path>>(
    records: &[Record],
    path: P,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    match format {
        ExportFormat::Csv => export_csv_to_file(records, path)?,
        ExportFormat::Excel => export_xlsx_to_file(records, path)?,
        ExportFormat::Pdf => export_pdf_to_file(records, path)?,
    }
    info!(
        "exported {} records as {} to {}",
        records.len(),
        format,
        path.display()
    );
    Ok(())
}

/// Write `records` to `path`, choosing the format from the file extension
pub fn export_auto<P: AsRef<Path>>(records: &[Record], path: P) -> Result<ExportFormat, ExportError> {
    let path = path.as_ref();
    let format = ExportFormat::from_extension(path)
        .ok_or_else(|| ExportError::UnsupportedFormat(path.display().to_string()))?;
    export(records, path, format)?;
    Ok(format)
}

/// Default file name for an export started at `start_time`
pub fn generate_filename(start_time: &DateTime<Local>, format: ExportFormat) -> String {
    format!(
        "datalog_{}.{}",
        start_time.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_filename() {
        let start = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            generate_filename(&start, ExportFormat::Excel),
            "datalog_20240309_070501.xlsx"
        );
    }

    #[test]
    fn test_export_auto_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_auto(&[], dir.path().join("out.docx"));
        assert!(matches!(result, Err(ExportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_export_error_message_carries_cause() {
        let err = ExportError::failed(ExportFormat::Pdf, "disk full");
        assert_eq!(err.to_string(), "PDF export failed: disk full");
    }
}
