use health_trace::commands::{execute_convert, ConvertArgs, RunStatus};
use health_trace::output::{read_messages, summarize};
use health_trace::parser::InputKind;
use health_trace::utils::error::{ParseError, SourceError};
use health_trace::utils::time::parse_window_start;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ROUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="Apple Health Export" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><name>Route 2025-03-22 10:00am</name><trkseg>
    <trkpt lon="-122.0300" lat="37.3300"><ele>10.0</ele><time>2025-03-22T17:00:00Z</time></trkpt>
    <trkpt lon="-122.0301" lat="37.3301"><ele>10.5</ele><time>2025-03-22T17:00:01Z</time></trkpt>
    <trkpt lon="-122.0302" lat="37.3302"><ele>11.0</ele><time>2025-03-22T17:00:02Z</time></trkpt>
  </trkseg></trk>
</gpx>
"#;

const BAD_ECG: &str = "Name,Jane Doe\nRecorded Date,2025-03-22 10:00:00 -0700\n\n12.0\n13.0\n";

const ECG: &str = "Recorded Date,2025-03-22 10:00:00 -0700\nSample Rate,4 hertz\nUnit,µV\n\n1.0\n2.0\n3.0\n4.0\n";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn args(inputs: Vec<PathBuf>, output: PathBuf) -> ConvertArgs {
    ConvertArgs {
        inputs,
        output: Some(output),
        ..Default::default()
    }
}

fn topics(path: &Path) -> Vec<String> {
    read_messages(path)
        .unwrap()
        .into_iter()
        .map(|m| m.topic)
        .collect()
}

#[test]
fn test_gpx_yields_one_location_message_per_point() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let output = dir.path().join("out/route.mcap");

    let report = execute_convert(args(vec![route], output.clone())).unwrap();
    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.output.as_deref(), Some(output.as_path()));

    let messages = read_messages(&output).unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m.topic == "/location"));
    assert_eq!(
        messages[0].schema_name.as_deref(),
        Some("foxglove.LocationFix")
    );

    let sequences: Vec<u32> = messages.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2]);

    let times: Vec<u64> = messages.iter().map(|m| m.log_time).collect();
    assert_eq!(
        times,
        vec![
            1_742_662_800_000_000_000,
            1_742_662_801_000_000_000,
            1_742_662_802_000_000_000,
        ]
    );

    let first: serde_json::Value = serde_json::from_slice(&messages[0].payload).unwrap();
    assert_eq!(first["latitude"], 37.33);
    assert_eq!(first["longitude"], -122.03);
    assert_eq!(first["altitude"], 10.0);
}

#[test]
fn test_unsupported_extension_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "notes.foo", ROUTE);
    let output = dir.path().join("notes.mcap");

    let report = execute_convert(args(vec![input], output.clone())).unwrap();

    assert_eq!(report.status(), RunStatus::NoOutput);
    assert_eq!(report.status().exit_code(), 1);
    assert!(matches!(
        report.sources[0].error,
        Some(SourceError::Unsupported(_))
    ));
    assert!(!output.exists());
}

#[test]
fn test_input_type_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "notes.foo", ROUTE);
    let output = dir.path().join("notes.mcap");

    let report = execute_convert(ConvertArgs {
        input_types: vec![InputKind::Gpx],
        ..args(vec![input], output.clone())
    })
    .unwrap();

    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(topics(&output).len(), 3);
}

#[test]
fn test_malformed_ecg_gives_partial_output() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let ecg = write(dir.path(), "ecg.csv", BAD_ECG);
    let output = dir.path().join("combined.mcap");

    let report = execute_convert(args(vec![route, ecg], output.clone())).unwrap();

    assert_eq!(report.status(), RunStatus::Partial);
    assert_eq!(report.status().exit_code(), 2);
    assert!(report.sources[0].is_ok());
    assert!(matches!(
        report.sources[1].error,
        Some(SourceError::Parse(ParseError::MissingField { .. }))
    ));

    let summary = summarize(&output).unwrap();
    assert_eq!(summary.channels.len(), 1);
    assert_eq!(summary.channels[0].topic, "/location");
    assert_eq!(summary.total_messages, 3);
}

#[test]
fn test_sources_are_merged_by_timestamp() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    // 17:00:00Z at 4 Hz: samples at +0, +0.25, +0.5, +0.75 s
    let ecg = write(dir.path(), "ecg.csv", ECG);
    let output = dir.path().join("combined.mcap");

    let report = execute_convert(args(vec![route, ecg], output.clone())).unwrap();
    assert_eq!(report.status(), RunStatus::Complete);

    let messages = read_messages(&output).unwrap();
    let order: Vec<&str> = messages.iter().map(|m| m.topic.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "/location",
            "/ecg/lead_i",
            "/ecg/lead_i",
            "/ecg/lead_i",
            "/ecg/lead_i",
            "/location",
            "/location",
        ]
    );

    let ecg_times: Vec<u64> = messages
        .iter()
        .filter(|m| m.topic == "/ecg/lead_i")
        .map(|m| m.log_time - 1_742_662_800_000_000_000)
        .collect();
    assert_eq!(ecg_times, vec![0, 250_000_000, 500_000_000, 750_000_000]);
}

#[test]
fn test_overwrite_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let ecg = write(dir.path(), "ecg.csv", ECG);
    let output = dir.path().join("combined.mcap");

    let run = || {
        let report = execute_convert(ConvertArgs {
            overwrite: true,
            ..args(vec![route.clone(), ecg.clone()], output.clone())
        })
        .unwrap();
        assert_eq!(report.status(), RunStatus::Complete);
        (
            report.emitted.unwrap().topics,
            read_messages(&output).unwrap(),
        )
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn test_existing_output_is_refused_before_parsing() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let output = write(dir.path(), "route.mcap", "keep me");

    let result = execute_convert(args(vec![route], output.clone()));

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&output).unwrap(), "keep me");
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let output = dir.path().join("route.mcap");

    let report = execute_convert(ConvertArgs {
        dry_run: true,
        ..args(vec![route], output.clone())
    })
    .unwrap();

    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.output, None);
    assert_eq!(report.emitted.unwrap().count("/location"), 3);
    assert!(!output.exists());
}

#[test]
fn test_time_window_filters_records() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let output = dir.path().join("route.mcap");

    let report = execute_convert(ConvertArgs {
        from: Some(parse_window_start("2025-03-22T17:00:01Z").unwrap()),
        ..args(vec![route], output.clone())
    })
    .unwrap();

    assert_eq!(report.sources[0].records, 2);
    assert_eq!(topics(&output), vec!["/location", "/location"]);
}

#[test]
fn test_follow_routes_pulls_in_referenced_gpx() {
    let dir = TempDir::new().unwrap();
    let export = write(
        dir.path(),
        "apple_health_export/export.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2025-03-22 10:00:01 -0700" endDate="2025-03-22 10:00:01 -0700" value="121"/>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="1" durationUnit="min" sourceName="Watch" startDate="2025-03-22 09:59:59 -0700" endDate="2025-03-22 10:00:59 -0700">
  <WorkoutRoute sourceName="Watch" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:00:59 -0700">
   <FileReference path="/workout-routes/route_2025-03-22_10.00am.gpx"/>
  </WorkoutRoute>
 </Workout>
</HealthData>
"#,
    );
    write(
        dir.path(),
        "apple_health_export/workout-routes/route_2025-03-22_10.00am.gpx",
        ROUTE,
    );
    let output = dir.path().join("export.mcap");

    let report = execute_convert(ConvertArgs {
        follow_routes: true,
        ..args(vec![export], output.clone())
    })
    .unwrap();

    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.sources.len(), 2);
    assert!(report.sources[1].from_route);

    assert_eq!(
        topics(&output),
        vec!["/workout", "/location", "/HeartRate", "/location", "/location"]
    );
}

#[test]
fn test_missing_route_is_reported_as_failed_source() {
    let dir = TempDir::new().unwrap();
    let export = write(
        dir.path(),
        "export.xml",
        r#"<HealthData>
 <Workout workoutActivityType="HKWorkoutActivityTypeWalking" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:30:00 -0700">
  <WorkoutRoute><FileReference path="/workout-routes/missing.gpx"/></WorkoutRoute>
 </Workout>
</HealthData>"#,
    );
    let output = dir.path().join("export.mcap");

    let report = execute_convert(ConvertArgs {
        follow_routes: true,
        ..args(vec![export], output.clone())
    })
    .unwrap();

    assert_eq!(report.status(), RunStatus::Partial);
    assert!(matches!(
        report.sources[1].error,
        Some(SourceError::Parse(ParseError::Read { .. }))
    ));
    assert_eq!(topics(&output), vec!["/workout"]);
}

#[test]
fn test_pre_1970_recording_fails_only_its_source() {
    let dir = TempDir::new().unwrap();
    let route = write(dir.path(), "route.gpx", ROUTE);
    let ecg = write(
        dir.path(),
        "ecg.csv",
        "Recorded Date,1965-03-22 10:00:00 -0700\nSample Rate,4 hertz\nUnit,µV\n\n1.0\n2.0\n",
    );
    let output = dir.path().join("combined.mcap");

    let report = execute_convert(args(vec![route, ecg], output.clone())).unwrap();

    assert_eq!(report.status(), RunStatus::Partial);
    assert!(report.sources[0].is_ok());
    assert!(matches!(
        report.sources[1].error,
        Some(SourceError::Parse(ParseError::InvalidValue { ref field, .. })) if field == "timestamp"
    ));
    assert_eq!(report.output.as_deref(), Some(output.as_path()));
    assert_eq!(topics(&output), vec!["/location", "/location", "/location"]);
}

const TWO_WORKOUTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2025-03-20 08:10:00 -0700" endDate="2025-03-20 08:10:00 -0700" value="96"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2025-03-22 10:00:01 -0700" endDate="2025-03-22 10:00:01 -0700" value="121"/>
 <Workout workoutActivityType="HKWorkoutActivityTypeWalking" duration="20" durationUnit="min" sourceName="Watch" startDate="2025-03-20 08:00:00 -0700" endDate="2025-03-20 08:20:00 -0700"/>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="1" durationUnit="min" sourceName="Watch" startDate="2025-03-22 09:59:59 -0700" endDate="2025-03-22 10:00:59 -0700">
  <WorkoutRoute sourceName="Watch" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:00:59 -0700">
   <FileReference path="/workout-routes/route_2025-03-22_10.00am.gpx"/>
  </WorkoutRoute>
 </Workout>
</HealthData>
"#;

#[test]
fn test_workout_selection_sets_window_and_follows_route() {
    let dir = TempDir::new().unwrap();
    let export = write(dir.path(), "apple_health_export/export.xml", TWO_WORKOUTS);
    write(
        dir.path(),
        "apple_health_export/workout-routes/route_2025-03-22_10.00am.gpx",
        ROUTE,
    );
    let output_dir = dir.path().join("out");

    let report = execute_convert(ConvertArgs {
        inputs: vec![export],
        output_dir: output_dir.clone(),
        workout: Some(1),
        ..Default::default()
    })
    .unwrap();

    let expected = output_dir.join("Running-2025-03-22_165959.mcap");
    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.output.as_deref(), Some(expected.as_path()));
    assert!(report.sources[1].from_route);

    // the older walk and its heart rate fall outside the selected session
    assert_eq!(
        topics(&expected),
        vec!["/workout", "/location", "/HeartRate", "/location", "/location"]
    );
}

#[test]
fn test_workout_selection_out_of_range() {
    let dir = TempDir::new().unwrap();
    let export = write(dir.path(), "export.xml", TWO_WORKOUTS);
    let output = dir.path().join("out.mcap");

    let result = execute_convert(ConvertArgs {
        workout: Some(3),
        ..args(vec![export], output.clone())
    });

    assert!(result.is_err());
    assert!(!output.exists());
}

#[test]
fn test_export_with_route_is_limited_to_route_span() {
    let dir = TempDir::new().unwrap();
    let export = write(dir.path(), "export.xml", TWO_WORKOUTS);
    let route = write(dir.path(), "route.gpx", ROUTE);
    let output = dir.path().join("combined.mcap");

    let report = execute_convert(args(vec![export, route], output.clone())).unwrap();

    assert_eq!(report.status(), RunStatus::Complete);
    // only the 17:00:01Z heart rate starts inside 17:00:00Z..17:00:02Z
    assert_eq!(report.sources[0].records, 1);
    assert_eq!(
        topics(&output),
        vec!["/location", "/HeartRate", "/location", "/location"]
    );
}
