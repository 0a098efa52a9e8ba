//! Apple Health `export.xml` parser.
//!
//! Extracts:
//! - `<Workout>` elements as workout sessions (with statistics and route reference)
//! - `<Record>` elements of quantity types as scalar samples
//!
//! Everything else in the export (category records, correlations, activity
//! summaries, `<Me>`, `<ExportDate>`) is skipped.

use super::xml::{child_element, invalid_value, node_location, parse_document, required_attr};
use super::{FormatParser, ParseOptions};
use crate::record::{Quantity, Record, ScalarKind, ScalarSample, WorkoutSession, WorkoutStatistic};
use crate::utils::config::{QUANTITY_TYPE_PREFIX, WORKOUT_TYPE_PREFIX};
use crate::utils::error::ParseError;
use crate::utils::time::parse_apple_date;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use roxmltree::Node;
use std::path::{Path, PathBuf};

/// Root element of an Apple Health export
const EXPORT_ROOT: &str = "HealthData";

/// Parser for Apple Health exports
#[derive(Debug, Clone, Default)]
pub struct WorkoutParser {
    excluded_sources: Vec<String>,
}

impl WorkoutParser {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            excluded_sources: options.excluded_sources.clone(),
        }
    }

    fn is_excluded(&self, node: Node<'_, '_>) -> bool {
        node.attribute("sourceName")
            .map(|name| self.excluded_sources.iter().any(|excluded| excluded == name))
            .unwrap_or(false)
    }
}

impl FormatParser for WorkoutParser {
    fn parse(&self, origin: &Path, content: &str) -> Result<Vec<Record>, ParseError> {
        debug!("Parsing health export: {}", origin.display());

        let doc = parse_document(origin, content, EXPORT_ROOT)?;
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut excluded = 0usize;

        for node in doc.root_element().children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "Record" | "Workout" if self.is_excluded(node) => excluded += 1,
                "Record" => match parse_quantity_record(origin, node)? {
                    Some(sample) => records.push(sample.into()),
                    None => skipped += 1,
                },
                "Workout" => records.push(parse_workout(origin, node)?.into()),
                _ => skipped += 1,
            }
        }

        debug!(
            "Export parsed: {} records, {} skipped, {} from excluded sources",
            records.len(),
            skipped,
            excluded
        );

        Ok(records)
    }
}

/// Parse a `<Record>` element
///
/// Returns `Ok(None)` for record types that are not numeric quantities.
fn parse_quantity_record(
    origin: &Path,
    node: Node<'_, '_>,
) -> Result<Option<ScalarSample>, ParseError> {
    let raw_type = required_attr(origin, node, "type")?;
    if !raw_type.starts_with(QUANTITY_TYPE_PREFIX) {
        return Ok(None);
    }

    let start = required_date(origin, node, "startDate")?;
    let end = required_date(origin, node, "endDate")?;
    if end < start {
        warn!(
            "{}: record ends before it starts, keeping endDate as its timestamp",
            node_location(origin, node)
        );
    }

    let raw_value = required_attr(origin, node, "value")?;
    let value = raw_value
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid_value(origin, node, "value", raw_value, e))?;

    let mut sample = ScalarSample::new(
        end,
        ScalarKind::from_quantity_type(raw_type),
        value,
        node.attribute("unit"),
    )
    .with_source_name(node.attribute("sourceName").map(str::to_string));
    sample.start = (start != end).then_some(start);
    sample.source_version = node.attribute("sourceVersion").map(str::to_string);
    sample.device = node.attribute("device").map(str::to_string);
    sample.creation_date = optional_date(origin, node, "creationDate");

    Ok(Some(sample))
}

/// Parse a `<Workout>` element and its nested statistics and route
fn parse_workout(origin: &Path, node: Node<'_, '_>) -> Result<WorkoutSession, ParseError> {
    let raw_type = required_attr(origin, node, "workoutActivityType")?;
    let workout_type = raw_type
        .strip_prefix(WORKOUT_TYPE_PREFIX)
        .unwrap_or(raw_type)
        .to_string();

    let start = required_date(origin, node, "startDate")?;
    let end = required_date(origin, node, "endDate")?;
    if end < start {
        return Err(invalid_value(
            origin,
            node,
            "endDate",
            node.attribute("endDate").unwrap_or_default(),
            "workout ends before it starts",
        ));
    }

    let duration = match (node.attribute("duration"), node.attribute("durationUnit")) {
        (Some(raw), unit) => match raw.trim().parse::<f64>() {
            Ok(value) => Some(Quantity {
                value,
                unit: unit.unwrap_or_default().to_string(),
            }),
            Err(e) => {
                warn!(
                    "{}: ignoring unparseable workout duration '{}': {}",
                    node_location(origin, node),
                    raw,
                    e
                );
                None
            }
        },
        (None, _) => None,
    };

    let statistics = node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "WorkoutStatistics")
        .filter_map(|child| parse_statistic(origin, child))
        .collect();

    let route = node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "WorkoutRoute")
        .find_map(|child| child_element(child, "FileReference"))
        .and_then(|file_ref| file_ref.attribute("path"))
        .map(route_path);

    Ok(WorkoutSession {
        start,
        end,
        workout_type,
        source_name: node.attribute("sourceName").map(str::to_string),
        duration,
        route,
        statistics,
    })
}

/// Parse a `<WorkoutStatistics>` element; malformed entries are dropped with a warning
fn parse_statistic(origin: &Path, node: Node<'_, '_>) -> Option<WorkoutStatistic> {
    let Some(raw_type) = node.attribute("type") else {
        warn!(
            "{}: WorkoutStatistics without a type, skipping",
            node_location(origin, node)
        );
        return None;
    };

    let number = |name: &str| -> Option<f64> {
        let raw = node.attribute(name)?;
        match raw.trim().parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    "{}: ignoring unparseable {} '{}'",
                    node_location(origin, node),
                    name,
                    raw
                );
                None
            }
        }
    };

    Some(WorkoutStatistic {
        kind: ScalarKind::from_quantity_type(raw_type),
        unit: node.attribute("unit").map(str::to_string),
        average: number("average"),
        minimum: number("minimum"),
        maximum: number("maximum"),
        sum: number("sum"),
    })
}

/// Route references are written as `/workout-routes/route_….gpx`, relative to the export directory
fn route_path(raw: &str) -> PathBuf {
    PathBuf::from(raw.trim_start_matches('/'))
}

fn required_date(
    origin: &Path,
    node: Node<'_, '_>,
    name: &str,
) -> Result<DateTime<Utc>, ParseError> {
    let raw = required_attr(origin, node, name)?;
    parse_apple_date(raw).map_err(|e| invalid_value(origin, node, name, raw, e))
}

/// Parse an optional date attribute; a malformed value is dropped with a warning
fn optional_date(origin: &Path, node: Node<'_, '_>, name: &str) -> Option<DateTime<Utc>> {
    let raw = node.attribute(name)?;
    match parse_apple_date(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(
                "{}: ignoring unparseable {} '{}': {}",
                node_location(origin, node),
                name,
                raw,
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE HealthData [
<!ELEMENT HealthData (ExportDate,Me,(Record|Workout)*)>
<!ATTLIST HealthData locale CDATA #REQUIRED>
]>
<HealthData locale="en_US">
 <ExportDate value="2025-03-23 09:00:00 -0700"/>
 <Me HKCharacteristicTypeIdentifierBiologicalSex="HKBiologicalSexNotSet"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" sourceVersion="11.3" device="&lt;&lt;HKDevice: 0x2823, name:Apple Watch&gt;&gt;" unit="count/min" creationDate="2025-03-22 10:01:00 -0700" startDate="2025-03-22 10:00:55 -0700" endDate="2025-03-22 10:00:55 -0700" value="132"/>
 <Record type="HKCategoryTypeIdentifierSleepAnalysis" sourceName="Watch" startDate="2025-03-22 01:00:00 -0700" endDate="2025-03-22 06:00:00 -0700" value="HKCategoryValueSleepAnalysisAsleep"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="WaterMinder" unit="count" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:05:00 -0700" value="400"/>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="30" durationUnit="min" sourceName="Watch" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:30:00 -0700">
  <WorkoutStatistics type="HKQuantityTypeIdentifierHeartRate" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:30:00 -0700" average="141" minimum="98" maximum="171" unit="count/min"/>
  <WorkoutRoute sourceName="Watch" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:30:00 -0700">
   <FileReference path="/workout-routes/route_2025-03-22_10.00am.gpx"/>
  </WorkoutRoute>
 </Workout>
</HealthData>
"#;

    fn parse(parser: &WorkoutParser, content: &str) -> Result<Vec<Record>, ParseError> {
        parser.parse(Path::new("export.xml"), content)
    }

    #[test]
    fn test_parse_export_extracts_quantities_and_workouts() {
        let records = parse(&WorkoutParser::default(), EXPORT).unwrap();
        assert_eq!(records.len(), 3);

        let Record::Scalar(hr) = &records[0] else {
            panic!("expected heart rate sample first");
        };
        assert_eq!(hr.kind, ScalarKind::HeartRate);
        assert_eq!(hr.value, 132.0);
        assert_eq!(hr.source_name.as_deref(), Some("Watch"));
        assert_eq!(hr.source_version.as_deref(), Some("11.3"));
        assert_eq!(
            hr.device.as_deref(),
            Some("<<HKDevice: 0x2823, name:Apple Watch>>")
        );
        assert_eq!(hr.creation_date, parse_apple_date("2025-03-22 10:01:00 -0700").ok());
        // instantaneous reading: no separate start
        assert_eq!(hr.start, None);

        let Record::Scalar(steps) = &records[1] else {
            panic!("expected step count second");
        };
        assert_eq!(steps.start, parse_apple_date("2025-03-22 10:00:00 -0700").ok());
        assert_eq!(steps.timestamp, parse_apple_date("2025-03-22 10:05:00 -0700").unwrap());

        let session = records[2].as_workout().unwrap();
        assert_eq!(session.workout_type, "Running");
        assert_eq!(session.elapsed_seconds(), 1800.0);
        assert_eq!(
            session.route.as_deref(),
            Some(Path::new("workout-routes/route_2025-03-22_10.00am.gpx"))
        );
        assert_eq!(session.streams(), vec![&ScalarKind::HeartRate]);
        assert_eq!(session.statistics[0].maximum, Some(171.0));
    }

    #[test]
    fn test_excluded_sources_are_skipped() {
        let parser = WorkoutParser::new(&ParseOptions {
            excluded_sources: vec!["WaterMinder".to_string()],
        });
        let records = parse(&parser, EXPORT).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| match r {
            Record::Scalar(s) => s.kind == ScalarKind::HeartRate,
            _ => true,
        }));
    }

    #[test]
    fn test_malformed_creation_date_is_dropped() {
        let xml = r#"<HealthData><Record type="HKQuantityTypeIdentifierHeartRate" unit="count/min" creationDate="yesterday" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:00:00 -0700" value="90"/></HealthData>"#;
        let records = parse(&WorkoutParser::default(), xml).unwrap();
        let Record::Scalar(hr) = &records[0] else {
            panic!("expected scalar sample");
        };
        assert_eq!(hr.creation_date, None);
        assert_eq!(hr.value, 90.0);
    }

    #[test]
    fn test_workout_missing_end_date_fails() {
        let xml = r#"<HealthData><Workout workoutActivityType="HKWorkoutActivityTypeWalking" startDate="2025-03-22 10:00:00 -0700"/></HealthData>"#;
        let err = parse(&WorkoutParser::default(), xml).unwrap_err();
        match err {
            ParseError::MissingField { field, location, .. } => {
                assert_eq!(field, "endDate");
                assert_eq!(location.line, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_workout_ending_before_start_fails() {
        let xml = r#"<HealthData><Workout workoutActivityType="HKWorkoutActivityTypeWalking" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 09:00:00 -0700"/></HealthData>"#;
        assert!(matches!(
            parse(&WorkoutParser::default(), xml),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let xml = r#"<gpx version="1.1"><trk/></gpx>"#;
        assert!(matches!(
            parse(&WorkoutParser::default(), xml),
            Err(ParseError::UnexpectedDocument { .. })
        ));
    }
}
