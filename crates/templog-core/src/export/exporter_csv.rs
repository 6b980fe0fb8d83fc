//! CSV export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::ExportError;
use crate::datalog::{ExportFormat, Record, HEADER};

/// Write the header and one row per record to `writer`.
///
/// Plain fields are written as-is. A field containing a comma, quote or
/// line break is quoted so the file still has four columns per row.
pub fn export_csv<W: Write>(records: &[Record], writer: W) -> Result<(), ExportError> {
    let fail = |e: csv::Error| ExportError::failed(ExportFormat::Csv, e);

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(HEADER).map_err(fail)?;
    for record in records {
        wtr.write_record(record.fields()).map_err(fail)?;
    }
    wtr.flush()
        .map_err(|e| ExportError::failed(ExportFormat::Csv, e))
}

/// Write records to a CSV file at `path`
pub fn export_csv_to_file<P: AsRef<Path>>(records: &[Record], path: P) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|e| ExportError::failed(ExportFormat::Csv, e))?;
    export_csv(records, BufWriter::new(file))
}
