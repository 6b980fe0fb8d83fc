//! Excel export

use std::path::Path;

use rust_xlsxwriter::{Workbook, XlsxError};

use super::ExportError;
use crate::datalog::{ExportFormat, Record, HEADER};

/// Name of the single worksheet in exported workbooks
pub const SHEET_NAME: &str = "Data";

fn build_workbook(records: &[Record]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, label) in (0u16..).zip(HEADER) {
        sheet.write_string(0, col, label)?;
    }
    for (row, record) in (1u32..).zip(records) {
        for (col, value) in (0u16..).zip(record.fields()) {
            sheet.write_string(row, col, value)?;
        }
    }
    Ok(workbook)
}

/// Write records to an .xlsx workbook at `path`.
///
/// Values are stored as text so cells match what the device sent.
pub fn export_xlsx_to_file<P: AsRef<Path>>(records: &[Record], path: P) -> Result<(), ExportError> {
    let mut workbook =
        build_workbook(records).map_err(|e| ExportError::failed(ExportFormat::Excel, e))?;
    workbook
        .save(path.as_ref())
        .map_err(|e| ExportError::failed(ExportFormat::Excel, e))
}
