//! Loading saved datalog CSV files back into records

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::{parse_line, parse_timestamp, Record, HEADER};

/// Preamble rows the logger writes ahead of the data in its own DATALOG.csv
pub const DEVICE_LOG_PREAMBLE_ROWS: usize = 8;

/// Fields in a row of the logger's own file: timestamp, cabinet, set point
const DEVICE_LOG_FIELDS: usize = 3;

/// Errors that can occur while importing a datalog file
#[derive(Error, Debug)]
pub enum ImportError {
    /// The file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse one row of a saved file.
///
/// Rows with four or more fields go through [`parse_line`]. Three-field rows
/// (`timestamp,temperature,set temperature`, as the logger writes them to its
/// card) are accepted when the timestamp parses; the set temperature lands in
/// the min temperature column and the status is left empty.
pub fn parse_import_row(line: &str) -> Option<Record> {
    if let Some(record) = parse_line(line) {
        return Some(record);
    }
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != DEVICE_LOG_FIELDS || parse_timestamp(parts[0]).is_none() {
        return None;
    }
    Some(Record::new(parts[0], parts[1], parts[2], ""))
}

/// Read a datalog CSV file.
///
/// The first `skip_rows` lines are ignored, as are blank lines and the column
/// header line. Every other line goes through [`parse_import_row`]; lines it
/// rejects are skipped. A skip of zero also works for the logger's own files
/// since their preamble rows never carry a valid timestamp.
pub fn import_csv<P: AsRef<Path>>(path: P, skip_rows: usize) -> Result<Vec<Record>, ImportError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let header = HEADER.join(",");

    let mut records = Vec::new();
    let mut rejected = 0usize;
    for line in reader.lines().skip(skip_rows) {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() || line == header {
            continue;
        }
        match parse_import_row(line) {
            Some(record) => records.push(record),
            None => rejected += 1,
        }
    }

    debug!(
        "imported {} records from {} ({} lines rejected)",
        records.len(),
        path.as_ref().display(),
        rejected
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_import_skips_preamble_and_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Logger v1.2").unwrap();
        writeln!(file, "Serial 0042").unwrap();
        writeln!(file, "DateTime,Temperature,MinTemp,Status").unwrap();
        writeln!(file, "01/02/2024 10:00:00,4.5,3.0,OK").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "broken,line").unwrap();
        writeln!(file, "01/02/2024 10:01:00,4.7,3.0,OK\r").unwrap();

        let records = import_csv(file.path(), 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].temperature(), "4.5");
        assert_eq!(records[1].status(), "OK");
    }

    #[test]
    fn test_import_device_log_layout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "TempLogger TL-100").unwrap();
        writeln!(file, "Firmware,2.1,release").unwrap();
        writeln!(file, "Serial,0042").unwrap();
        writeln!(file, "Interval,60s").unwrap();
        writeln!(file, "Set point,4.0,C").unwrap();
        writeln!(file, "Alarm,8.0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "Date,Temperature,setTemp").unwrap();
        writeln!(file, "01/02/2024 10:00:00,4.5,3.0").unwrap();
        writeln!(file, "01/02/2024 10:01:00,4.7,3.0\r").unwrap();

        for skip in [0, DEVICE_LOG_PREAMBLE_ROWS] {
            let records = import_csv(file.path(), skip).unwrap();
            assert_eq!(records.len(), 2, "skip {skip}");
            assert_eq!(
                records[0].fields(),
                ["01/02/2024 10:00:00", "4.5", "3.0", ""]
            );
            assert_eq!(records[1].temperature(), "4.7");
        }
    }

    #[test]
    fn test_import_row_rejects_three_fields_without_timestamp() {
        assert!(parse_import_row("Set point,4.0,C").is_none());
        assert!(parse_import_row("01/02/2024 10:00:00,4.5").is_none());
        assert!(parse_import_row("2024-01-01 10:00:00,4.5,3.0").is_some());
    }

    #[test]
    fn test_import_missing_file() {
        let result = import_csv("/nonexistent/templog/data.csv", 0);
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
