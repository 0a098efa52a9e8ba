//! Timestamp parsing and conversion helpers shared by parsers, emitter and CLI.

use super::config::APPLE_DATE_FORMAT;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Parse an Apple Health date (`2025-03-22 10:15:30 -0700`) into UTC
pub fn parse_apple_date(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(value.trim(), APPLE_DATE_FORMAT).map(|dt| dt.with_timezone(&Utc))
}

/// Parse an RFC 3339 timestamp (as found in GPX `<time>`) into UTC
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map(|dt| dt.with_timezone(&Utc))
}

/// Convert a timestamp to Unix nanoseconds for container log times
///
/// Returns `None` for instants before the epoch or beyond the i64 nanosecond range.
pub fn to_unix_nanos(timestamp: &DateTime<Utc>) -> Option<u64> {
    timestamp
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
}

/// Parse the lower bound of a `--from` window
///
/// Accepts RFC 3339, the Apple date format, or a bare `YYYY-MM-DD`
/// (start of that day, UTC).
pub fn parse_window_start(value: &str) -> Result<DateTime<Utc>, String> {
    parse_window_bound(value, NaiveTime::MIN)
}

/// Parse the upper bound of a `--to` window
///
/// A bare `YYYY-MM-DD` covers the whole day.
pub fn parse_window_end(value: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    parse_window_bound(value, end_of_day)
}

fn parse_window_bound(value: &str, day_time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = parse_rfc3339(value) {
        return Ok(dt);
    }
    if let Ok(dt) = parse_apple_date(value) {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|date| date.and_time(day_time).and_utc())
        .map_err(|_| {
            format!(
                "'{}' is not a recognized time (expected RFC 3339, '{}' or YYYY-MM-DD)",
                value, APPLE_DATE_FORMAT
            )
        })
}
