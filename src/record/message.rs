//! Wire representation of records: JSON payloads and their JSON Schemas.
//!
//! Location fixes follow the `foxglove.LocationFix` layout so map panels can
//! render routes directly. The optional GPS extension metrics ride along as
//! extra fields.

use super::types::{LocationSample, Record, RecordKind, ScalarSample, WorkoutSession};
use crate::output::sink::ChannelSpec;
use crate::utils::config::{LOCATION_SCHEMA, SCALAR_SCHEMA, WORKOUT_SCHEMA};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

/// `foxglove.LocationFix` covariance type: unknown
const COVARIANCE_UNKNOWN: u8 = 0;
/// `foxglove.LocationFix` covariance type: diagonal known
const COVARIANCE_DIAGONAL_KNOWN: u8 = 2;

#[derive(Debug, Serialize)]
struct Time {
    sec: i64,
    nsec: u32,
}

impl From<&DateTime<Utc>> for Time {
    fn from(dt: &DateTime<Utc>) -> Self {
        Self {
            sec: dt.timestamp(),
            nsec: dt.timestamp_subsec_nanos(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LocationFixMessage<'a> {
    timestamp: Time,
    frame_id: &'a str,
    latitude: f64,
    longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude: Option<f64>,
    position_covariance: [f64; 9],
    position_covariance_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    course: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ScalarMessage<'a> {
    timestamp: Time,
    kind: &'a str,
    value: f64,
    unit: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creation_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatisticMessage<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sum: Option<f64>,
}

#[derive(Debug, Serialize)]
struct WorkoutMessage<'a> {
    timestamp: Time,
    workout_type: &'a str,
    start: String,
    end: String,
    elapsed_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<&'a super::types::Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<String>,
    streams: Vec<&'a str>,
    statistics: Vec<StatisticMessage<'a>>,
}

/// Serialize a record into its JSON message payload
///
/// **Public** - used by the emitter for every sink write
pub fn encode_payload(record: &Record) -> Result<Vec<u8>, serde_json::Error> {
    match record {
        Record::Location(sample) => serde_json::to_vec(&location_message(sample)),
        Record::Scalar(sample) => serde_json::to_vec(&scalar_message(sample)),
        Record::Workout(session) => serde_json::to_vec(&workout_message(session)),
    }
}

fn location_message(sample: &LocationSample) -> LocationFixMessage<'_> {
    let frame_id = sample
        .source
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("gps");

    let (position_covariance, position_covariance_type) =
        match (sample.horizontal_accuracy, sample.vertical_accuracy) {
            (Some(h), Some(v)) => {
                let mut cov = [0.0; 9];
                cov[0] = h * h;
                cov[4] = h * h;
                cov[8] = v * v;
                (cov, COVARIANCE_DIAGONAL_KNOWN)
            }
            _ => ([0.0; 9], COVARIANCE_UNKNOWN),
        };

    LocationFixMessage {
        timestamp: Time::from(&sample.timestamp),
        frame_id,
        latitude: sample.latitude,
        longitude: sample.longitude,
        altitude: sample.elevation,
        position_covariance,
        position_covariance_type,
        speed: sample.speed,
        course: sample.course,
    }
}

fn scalar_message(sample: &ScalarSample) -> ScalarMessage<'_> {
    ScalarMessage {
        timestamp: Time::from(&sample.timestamp),
        kind: sample.kind.name(),
        value: sample.value,
        unit: &sample.unit,
        start: sample.start.as_ref().map(rfc3339),
        source_name: sample.source_name.as_deref(),
        source_version: sample.source_version.as_deref(),
        device: sample.device.as_deref(),
        creation_date: sample.creation_date.as_ref().map(rfc3339),
    }
}

fn rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn workout_message(session: &WorkoutSession) -> WorkoutMessage<'_> {
    WorkoutMessage {
        timestamp: Time::from(&session.start),
        workout_type: &session.workout_type,
        start: rfc3339(&session.start),
        end: rfc3339(&session.end),
        elapsed_s: session.elapsed_seconds(),
        duration: session.duration.as_ref(),
        source_name: session.source_name.as_deref(),
        route: session.route.as_ref().map(|p| p.display().to_string()),
        streams: session.streams().into_iter().map(|k| k.name()).collect(),
        statistics: session
            .statistics
            .iter()
            .map(|stat| StatisticMessage {
                kind: stat.kind.name(),
                unit: stat.unit.as_deref(),
                average: stat.average,
                minimum: stat.minimum,
                maximum: stat.maximum,
                sum: stat.sum,
            })
            .collect(),
    }
}

/// Channel description (topic + schema) for a record kind
///
/// **Public** - used by the emitter when a kind is first seen
pub fn channel_spec(kind: &RecordKind) -> ChannelSpec {
    let (schema_name, schema) = match kind {
        RecordKind::Workout => (WORKOUT_SCHEMA, workout_schema()),
        RecordKind::Location => (LOCATION_SCHEMA, location_schema()),
        RecordKind::Scalar(_) => (SCALAR_SCHEMA, scalar_schema()),
    };
    ChannelSpec {
        topic: kind.topic(),
        schema_name: schema_name.to_string(),
        schema,
    }
}

fn time_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "sec": {"type": "integer"},
            "nsec": {"type": "integer", "minimum": 0}
        }
    })
}

fn location_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "title": LOCATION_SCHEMA,
        "properties": {
            "timestamp": time_schema(),
            "frame_id": {"type": "string"},
            "latitude": {"type": "number"},
            "longitude": {"type": "number"},
            "altitude": {"type": "number"},
            "position_covariance": {
                "type": "array",
                "items": {"type": "number"},
                "minItems": 9,
                "maxItems": 9
            },
            "position_covariance_type": {"type": "integer"},
            "speed": {"type": "number"},
            "course": {"type": "number"}
        }
    })
}

fn scalar_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "title": SCALAR_SCHEMA,
        "properties": {
            "timestamp": time_schema(),
            "kind": {"type": "string"},
            "value": {"type": "number"},
            "unit": {"type": "string"},
            "start": {"type": "string", "format": "date-time"},
            "source_name": {"type": "string"},
            "source_version": {"type": "string"},
            "device": {"type": "string"},
            "creation_date": {"type": "string", "format": "date-time"}
        }
    })
}

fn workout_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "title": WORKOUT_SCHEMA,
        "properties": {
            "timestamp": time_schema(),
            "workout_type": {"type": "string"},
            "start": {"type": "string"},
            "end": {"type": "string"},
            "elapsed_s": {"type": "number"},
            "duration": {
                "type": "object",
                "properties": {
                    "value": {"type": "number"},
                    "unit": {"type": "string"}
                }
            },
            "source_name": {"type": "string"},
            "route": {"type": "string"},
            "streams": {"type": "array", "items": {"type": "string"}},
            "statistics": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "kind": {"type": "string"},
                        "unit": {"type": "string"},
                        "average": {"type": "number"},
                        "minimum": {"type": "number"},
                        "maximum": {"type": "number"},
                        "sum": {"type": "number"}
                    }
                }
            }
        }
    })
}
