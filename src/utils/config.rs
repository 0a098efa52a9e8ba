//! Configuration and constants for the CLI.

/// Date format used by Apple Health exports and ECG headers
/// (e.g. `2025-03-22 10:15:30 -0700`)
pub const APPLE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Default location of an unpacked Apple Health export
pub const DEFAULT_EXPORT_FILE: &str = "./apple_health_export/export.xml";
pub const DEFAULT_ROUTES_DIR: &str = "./apple_health_export/workout-routes";

/// Default directory for generated MCAP files
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// File extension of generated container logs
pub const OUTPUT_EXTENSION: &str = "mcap";

/// Workout summaries cache, written next to export.xml
pub const WORKOUT_CACHE_FILE: &str = "workout_cache.json";

/// Number of entries shown by the listing commands unless `--all` is given
pub const DEFAULT_LIST_LIMIT: usize = 10;

// Apple type identifier prefixes, stripped for channel names
pub const QUANTITY_TYPE_PREFIX: &str = "HKQuantityTypeIdentifier";
pub const WORKOUT_TYPE_PREFIX: &str = "HKWorkoutActivityType";

// Channel topics
pub const WORKOUT_TOPIC: &str = "/workout";
pub const LOCATION_TOPIC: &str = "/location";
pub const HEART_RATE_TOPIC: &str = "/HeartRate";
pub const ECG_TOPIC: &str = "/ecg/lead_i";

// Schema names registered with the container
pub const WORKOUT_SCHEMA: &str = "health.WorkoutSession";
pub const LOCATION_SCHEMA: &str = "foxglove.LocationFix";
pub const SCALAR_SCHEMA: &str = "health.ScalarSample";

// Container encodings
pub const SCHEMA_ENCODING: &str = "jsonschema";
pub const MESSAGE_ENCODING: &str = "json";

// Units fixed by record kind
pub const HEART_RATE_UNIT: &str = "count/min";
pub const ECG_UNIT: &str = "µV";

// ECG header keys
pub const ECG_SAMPLE_RATE_KEY: &str = "Sample Rate";
pub const ECG_RECORDED_DATE_KEY: &str = "Recorded Date";
