//! ECG recording parser (Apple Health `electrocardiograms/*.csv`).
//!
//! File layout:
//! ```text
//! Name,Jane Doe
//! Recorded Date,2025-03-22 10:15:30 -0700
//! Sample Rate,512 hertz
//! Lead,Lead I
//! Unit,µV
//!
//! -12.345
//! -10.001
//! ```
//! The header ends at the first row whose first field is numeric. Sample k
//! (0-based) is stamped `Recorded Date + k / Sample Rate`.

use super::FormatParser;
use crate::record::{Record, ScalarKind, ScalarSample};
use crate::utils::config::{ECG_RECORDED_DATE_KEY, ECG_SAMPLE_RATE_KEY};
use crate::utils::error::{ParseError, SourceLocation};
use crate::utils::time::parse_apple_date;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::path::Path;

/// Parser for ECG CSV recordings
#[derive(Debug, Clone, Copy, Default)]
pub struct EcgParser;

/// Header fields needed to timestamp samples
#[derive(Debug, Default)]
struct EcgHeader {
    sample_rate_hz: Option<f64>,
    recorded_at: Option<DateTime<Utc>>,
}

impl EcgHeader {
    fn read_row(&mut self, origin: &Path, line: u32, key: &str, value: &str) -> Result<(), ParseError> {
        if key.starts_with(ECG_SAMPLE_RATE_KEY) {
            // e.g. "512 hertz"
            let rate = value
                .split_whitespace()
                .next()
                .and_then(|token| token.parse::<f64>().ok())
                .filter(|rate| rate.is_finite() && *rate > 0.0)
                .ok_or_else(|| ParseError::InvalidValue {
                    location: SourceLocation::line(origin, line),
                    field: ECG_SAMPLE_RATE_KEY.to_string(),
                    value: value.to_string(),
                    reason: "expected a positive rate such as '512 hertz'".to_string(),
                })?;
            self.sample_rate_hz = Some(rate);
        } else if key == ECG_RECORDED_DATE_KEY {
            let recorded_at = parse_apple_date(value).map_err(|e| ParseError::InvalidValue {
                location: SourceLocation::line(origin, line),
                field: ECG_RECORDED_DATE_KEY.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })?;
            self.recorded_at = Some(recorded_at);
        }
        Ok(())
    }

    /// Both required fields, or the first one missing
    fn complete(&self, origin: &Path) -> Result<SampleClock, ParseError> {
        let missing = |field: &str| ParseError::MissingField {
            location: SourceLocation::file(origin),
            element: "header".to_string(),
            field: field.to_string(),
        };
        let rate = self
            .sample_rate_hz
            .ok_or_else(|| missing(ECG_SAMPLE_RATE_KEY))?;
        let start = self
            .recorded_at
            .ok_or_else(|| missing(ECG_RECORDED_DATE_KEY))?;
        Ok(SampleClock { start, rate })
    }
}

/// Fixed-interval clock derived from the header
#[derive(Debug, Clone, Copy)]
struct SampleClock {
    start: DateTime<Utc>,
    rate: f64,
}

impl SampleClock {
    /// Timestamp of sample `index`, rounded to the nearest nanosecond
    fn at(&self, index: u64) -> DateTime<Utc> {
        let offset_ns = (index as f64 * 1e9 / self.rate).round() as i64;
        self.start + Duration::nanoseconds(offset_ns)
    }
}

impl FormatParser for EcgParser {
    fn parse(&self, origin: &Path, content: &str) -> Result<Vec<Record>, ParseError> {
        debug!("Parsing ECG recording: {}", origin.display());

        let content = content.trim_start_matches('\u{feff}');
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut header = EcgHeader::default();
        let mut clock: Option<SampleClock> = None;
        let mut records = Vec::new();

        for row in reader.records() {
            let row = row.map_err(|e| ParseError::Csv {
                location: match e.position() {
                    Some(pos) => SourceLocation::line(origin, pos.line() as u32),
                    None => SourceLocation::file(origin),
                },
                source: e,
            })?;
            let line = row.position().map(|p| p.line() as u32).unwrap_or_default();

            let first = row.get(0).unwrap_or_default();
            if first.is_empty() {
                continue;
            }

            let active = match clock {
                Some(active) => active,
                None => {
                    if first.parse::<f64>().is_err() {
                        header.read_row(origin, line, first, row.get(1).unwrap_or_default())?;
                        continue;
                    }
                    let started = header.complete(origin)?;
                    debug!(
                        "ECG header: {} Hz starting {}",
                        started.rate, started.start
                    );
                    clock = Some(started);
                    started
                }
            };

            let voltage = first.parse::<f64>().map_err(|e| ParseError::InvalidValue {
                location: SourceLocation::line(origin, line),
                field: "voltage".to_string(),
                value: first.to_string(),
                reason: e.to_string(),
            })?;

            let index = records.len() as u64;
            records.push(
                ScalarSample::new(active.at(index), ScalarKind::EcgVoltage, voltage, None).into(),
            );
        }

        // A recording without samples still needs a valid header
        if clock.is_none() {
            header.complete(origin)?;
        }

        debug!("Parsed {} ECG samples", records.len());
        Ok(records)
    }
}
