//! Data Logging
//!
//! Records received from the datalogger, the line parser that produces them,
//! and the store that accumulates them for display and export.

mod format;
mod import;
mod parser;
mod series;
mod store;

pub use format::ExportFormat;
pub use import::{import_csv, parse_import_row, ImportError, DEVICE_LOG_PREAMBLE_ROWS};
pub use parser::{parse_line, LineBuffer};
pub use series::{parse_timestamp, SeriesPoint, SeriesSummary, TemperatureSeries};
pub use store::RecordStore;

use serde::{Deserialize, Serialize};

/// Column labels shared by every export format, in field order
pub const HEADER: [&str; 4] = ["DateTime", "Temperature", "MinTemp", "Status"];

/// Minimum number of comma-separated fields in a datalog line
pub const MIN_FIELDS: usize = 4;

/// One datalog entry as received from the device.
///
/// All fields keep the exact text the device sent so exports reproduce the
/// source formatting. A record cannot be modified once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    timestamp: String,
    temperature: String,
    min_temperature: String,
    status: String,
}

impl Record {
    /// Create a record from its four text fields
    pub fn new(
        timestamp: impl Into<String>,
        temperature: impl Into<String>,
        min_temperature: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            temperature: temperature.into(),
            min_temperature: min_temperature.into(),
            status: status.into(),
        }
    }

    /// Device timestamp, as sent
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Current temperature reading
    pub fn temperature(&self) -> &str {
        &self.temperature
    }

    /// Minimum (or set point) temperature
    pub fn min_temperature(&self) -> &str {
        &self.min_temperature
    }

    /// Status word such as `OK` or `ALARM`
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Fields in column order (matches [`HEADER`])
    pub fn fields(&self) -> [&str; 4] {
        [
            &self.timestamp,
            &self.temperature,
            &self.min_temperature,
            &self.status,
        ]
    }
}
