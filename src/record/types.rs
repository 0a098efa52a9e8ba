//! Normalized record types emitted by every parser.
//!
//! Records are created once at parse time and never mutated afterwards.
//! They are consumed exactly once by the ordered emitter.

use crate::utils::config::{
    ECG_TOPIC, ECG_UNIT, HEART_RATE_TOPIC, HEART_RATE_UNIT, LOCATION_TOPIC, QUANTITY_TYPE_PREFIX,
    WORKOUT_TOPIC,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Valid latitude range in degrees
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Valid longitude range in degrees
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Kind of a scalar measurement
///
/// The kind determines the unit and the channel a sample is written to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarKind {
    HeartRate,
    EcgVoltage,
    /// Any other quantity, named by its Apple type without the identifier prefix
    Other(String),
}

impl ScalarKind {
    /// Map an Apple quantity type identifier to a kind
    ///
    /// `HKQuantityTypeIdentifierHeartRate` -> `HeartRate`,
    /// `HKQuantityTypeIdentifierStepCount` -> `Other("StepCount")`
    pub fn from_quantity_type(raw_type: &str) -> Self {
        let name = raw_type.strip_prefix(QUANTITY_TYPE_PREFIX).unwrap_or(raw_type);
        match name {
            "HeartRate" => ScalarKind::HeartRate,
            other => ScalarKind::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScalarKind::HeartRate => "HeartRate",
            ScalarKind::EcgVoltage => "EcgVoltage",
            ScalarKind::Other(name) => name,
        }
    }

    /// Unit implied by the kind, if any
    pub fn fixed_unit(&self) -> Option<&'static str> {
        match self {
            ScalarKind::HeartRate => Some(HEART_RATE_UNIT),
            ScalarKind::EcgVoltage => Some(ECG_UNIT),
            ScalarKind::Other(_) => None,
        }
    }

    pub fn topic(&self) -> String {
        match self {
            ScalarKind::HeartRate => HEART_RATE_TOPIC.to_string(),
            ScalarKind::EcgVoltage => ECG_TOPIC.to_string(),
            ScalarKind::Other(name) => format!("/{}", name),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A GPS fix from a route file
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level; `None` when the source has no elevation
    pub elevation: Option<f64>,
    /// Metres per second
    pub speed: Option<f64>,
    /// Degrees clockwise from north
    pub course: Option<f64>,
    pub horizontal_accuracy: Option<f64>,
    pub vertical_accuracy: Option<f64>,
    /// File the fix was read from
    pub source: Arc<Path>,
}

impl LocationSample {
    /// Create a fix without elevation or extension metrics
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64, source: Arc<Path>) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            elevation: None,
            speed: None,
            course: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            source,
        }
    }
}

/// Check a coordinate against an inclusive range (NaN is never in range)
pub fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

/// A single timestamped measurement
///
/// Values are passed through exactly as read; out-of-range readings are not clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSample {
    pub timestamp: DateTime<Utc>,
    pub kind: ScalarKind,
    pub value: f64,
    pub unit: String,
    /// Start of the measured interval when it differs from `timestamp`
    pub start: Option<DateTime<Utc>>,
    /// Recording app or device name, when the source declares one
    pub source_name: Option<String>,
    pub source_version: Option<String>,
    /// Device description as written by the export (`<<HKDevice: …>>`)
    pub device: Option<String>,
    /// When the sample was saved to the health store
    pub creation_date: Option<DateTime<Utc>>,
}

impl ScalarSample {
    /// Create a sample whose unit is implied by its kind
    ///
    /// Kinds without a fixed unit fall back to `declared_unit`.
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: ScalarKind,
        value: f64,
        declared_unit: Option<&str>,
    ) -> Self {
        let unit = kind
            .fixed_unit()
            .or(declared_unit)
            .unwrap_or_default()
            .to_string();
        Self {
            timestamp,
            kind,
            value,
            unit,
            start: None,
            source_name: None,
            source_version: None,
            device: None,
            creation_date: None,
        }
    }

    pub fn with_source_name(mut self, source_name: Option<String>) -> Self {
        self.source_name = source_name;
        self
    }
}

/// A value with its unit, as declared by the export
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

/// Aggregate statistics recorded for one quantity during a workout
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutStatistic {
    pub kind: ScalarKind,
    pub unit: Option<String>,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub sum: Option<f64>,
}

/// Workout session metadata
///
/// The route and stream links are references only: the session does not own
/// the samples they point to.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Activity type without the `HKWorkoutActivityType` prefix (e.g. `Running`)
    pub workout_type: String,
    pub source_name: Option<String>,
    /// Duration as declared by the export
    pub duration: Option<Quantity>,
    /// Route file, as referenced by the export (relative to the export directory)
    pub route: Option<PathBuf>,
    pub statistics: Vec<WorkoutStatistic>,
}

impl WorkoutSession {
    /// Scalar kinds recorded during this workout, in declaration order
    pub fn streams(&self) -> Vec<&ScalarKind> {
        let mut streams: Vec<&ScalarKind> = Vec::new();
        for stat in &self.statistics {
            if !streams.contains(&&stat.kind) {
                streams.push(&stat.kind);
            }
        }
        streams
    }

    pub fn elapsed_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Record kind, ordered for tie-breaking between equal timestamps
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Workout,
    Location,
    Scalar(ScalarKind),
}

impl RecordKind {
    /// Channel topic records of this kind are written to
    pub fn topic(&self) -> String {
        match self {
            RecordKind::Workout => WORKOUT_TOPIC.to_string(),
            RecordKind::Location => LOCATION_TOPIC.to_string(),
            RecordKind::Scalar(kind) => kind.topic(),
        }
    }
}

/// One normalized unit of health data
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Location(LocationSample),
    Scalar(ScalarSample),
    Workout(WorkoutSession),
}

impl Record {
    /// Instant the record is logged at (session start for workouts)
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Location(sample) => sample.timestamp,
            Record::Scalar(sample) => sample.timestamp,
            Record::Workout(session) => session.start,
        }
    }

    /// Start of the interval the record covers
    ///
    /// Export samples measured over an interval start before their timestamp.
    pub fn started_at(&self) -> DateTime<Utc> {
        match self {
            Record::Scalar(sample) => sample.start.unwrap_or(sample.timestamp),
            other => other.timestamp(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Location(_) => RecordKind::Location,
            Record::Scalar(sample) => RecordKind::Scalar(sample.kind.clone()),
            Record::Workout(_) => RecordKind::Workout,
        }
    }

    pub fn as_workout(&self) -> Option<&WorkoutSession> {
        match self {
            Record::Workout(session) => Some(session),
            _ => None,
        }
    }
}

impl From<LocationSample> for Record {
    fn from(sample: LocationSample) -> Self {
        Record::Location(sample)
    }
}

impl From<ScalarSample> for Record {
    fn from(sample: ScalarSample) -> Self {
        Record::Scalar(sample)
    }
}

impl From<WorkoutSession> for Record {
    fn from(session: WorkoutSession) -> Self {
        Record::Workout(session)
    }
}
