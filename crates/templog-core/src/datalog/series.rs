//! Numeric views of the text records, for charts and summaries

use chrono::NaiveDateTime;
use serde::Serialize;

use super::Record;

/// Timestamp layouts produced by known datalogger firmware
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// Parse a record timestamp, trying each known layout
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// One plotted sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Position of the source record in the store
    pub index: usize,
    /// Parsed timestamp, when it is in a known format
    pub time: Option<NaiveDateTime>,
    /// Temperature reading
    pub temperature: f64,
    /// Minimum temperature, when numeric
    pub min_temperature: Option<f64>,
}

/// Temperature series derived from a record snapshot.
///
/// Every record contributes a label; only records whose temperature parses
/// contribute a point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemperatureSeries {
    /// One timestamp label per record
    pub labels: Vec<String>,
    /// Numeric samples
    pub points: Vec<SeriesPoint>,
}

/// Min/max/latest over a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    /// Number of numeric samples
    pub count: usize,
    /// Lowest temperature
    pub min: f64,
    /// Highest temperature
    pub max: f64,
    /// Temperature of the last sample
    pub latest: f64,
}

impl TemperatureSeries {
    /// Build the series for `records`, in order
    pub fn from_records(records: &[Record]) -> Self {
        let mut series = Self::default();
        for (index, record) in records.iter().enumerate() {
            series.labels.push(record.timestamp().to_string());
            if let Ok(temperature) = record.temperature().trim().parse::<f64>() {
                series.points.push(SeriesPoint {
                    index,
                    time: parse_timestamp(record.timestamp()),
                    temperature,
                    min_temperature: record.min_temperature().trim().parse().ok(),
                });
            }
        }
        series
    }

    /// `None` when no record had a numeric temperature
    pub fn summary(&self) -> Option<SeriesSummary> {
        let latest = self.points.last()?.temperature;
        let (min, max) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.temperature), hi.max(p.temperature))
            });
        Some(SeriesSummary {
            count: self.points.len(),
            min,
            max,
            latest,
        })
    }
}
