use chrono::{NaiveDate, TimeZone, Utc};
use health_trace::commands::{list_routes, load_workouts, WorkoutSummary};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Workout workoutActivityType="HKWorkoutActivityTypeWalking" duration="20" durationUnit="min" sourceName="Watch" startDate="2025-03-20 08:00:00 -0700" endDate="2025-03-20 08:20:00 -0700"/>
 <Workout workoutActivityType="HKWorkoutActivityTypeRunning" duration="31.2" durationUnit="min" sourceName="Watch" startDate="2025-03-22 10:00:00 -0700" endDate="2025-03-22 10:31:12 -0700">
  <WorkoutRoute><FileReference path="/workout-routes/route_2025-03-22_10.00am.gpx"/></WorkoutRoute>
 </Workout>
 <Record type="HKQuantityTypeIdentifierHeartRate" unit="count/min" startDate="2025-03-22 10:01:00 -0700" endDate="2025-03-22 10:01:00 -0700" value="120"/>
</HealthData>
"#;

#[test]
fn test_workouts_sorted_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("export.xml");
    fs::write(&export, EXPORT).unwrap();

    let workouts = load_workouts(&export, false).unwrap();
    let types: Vec<&str> = workouts.iter().map(|w| w.workout_type.as_str()).collect();
    assert_eq!(types, vec!["Running", "Walking"]);

    assert_eq!(
        workouts[0].start_date,
        Utc.with_ymd_and_hms(2025, 3, 22, 17, 0, 0).unwrap()
    );
    assert_eq!(
        workouts[0].route,
        Some(PathBuf::from("workout-routes/route_2025-03-22_10.00am.gpx"))
    );
    assert_eq!(workouts[1].duration, Some(20.0));
    assert_eq!(workouts[1].duration_unit.as_deref(), Some("min"));

    assert!(dir.path().join("workout_cache.json").exists());
}

#[test]
fn test_fresh_cache_is_reused_until_refresh() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("export.xml");
    fs::write(&export, EXPORT).unwrap();
    let built = load_workouts(&export, false).unwrap();

    // Rewrite the cache so a cache hit is observable
    let cache = dir.path().join("workout_cache.json");
    let mut edited: Vec<WorkoutSummary> =
        serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    edited.truncate(1);
    fs::write(&cache, serde_json::to_string(&edited).unwrap()).unwrap();

    assert_eq!(load_workouts(&export, false).unwrap(), edited);
    assert_eq!(load_workouts(&export, true).unwrap(), built);
}

#[test]
fn test_invalid_cache_is_rebuilt() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("export.xml");
    fs::write(&export, EXPORT).unwrap();
    let cache = dir.path().join("workout_cache.json");
    fs::write(&cache, "{not json").unwrap();

    let workouts = load_workouts(&export, false).unwrap();
    assert_eq!(workouts.len(), 2);

    let rewritten: Vec<WorkoutSummary> =
        serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(rewritten, workouts);
}

#[test]
fn test_missing_export_fails() {
    let dir = TempDir::new().unwrap();
    assert!(load_workouts(&dir.path().join("export.xml"), false).is_err());
}

#[test]
fn test_routes_sorted_by_encoded_time() {
    let dir = TempDir::new().unwrap();
    for name in [
        "route_2025-03-22_7.05am.gpx",
        "route_2025-03-22_3.53pm.gpx",
        "route_2024-12-31_11.59pm.gpx",
        "notes.txt",
        "route_bad.gpx",
    ] {
        fs::write(dir.path().join(name), "<gpx/>").unwrap();
    }

    let routes = list_routes(dir.path()).unwrap();
    let names: Vec<String> = routes
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "route_2025-03-22_3.53pm.gpx",
            "route_2025-03-22_7.05am.gpx",
            "route_2024-12-31_11.59pm.gpx",
        ]
    );
    assert_eq!(
        routes[0].recorded,
        NaiveDate::from_ymd_opt(2025, 3, 22)
            .unwrap()
            .and_hms_opt(15, 53, 0)
            .unwrap()
    );
}

#[test]
fn test_missing_routes_dir_fails() {
    let dir = TempDir::new().unwrap();
    assert!(list_routes(&dir.path().join("workout-routes")).is_err());
}
