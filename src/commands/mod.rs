//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod convert;
pub mod models;
pub mod routes;
pub mod utils;
pub mod workouts;

// Re-export main command functions
pub use convert::{collect_sources, execute_convert, output_path, select_workout, validate_args};
pub use models::{ConvertArgs, RoutesArgs, RunReport, RunStatus, SourceOutcome, WorkoutsArgs};
pub use routes::{execute_routes, list_routes, parse_route_datetime, RouteFile};
pub use utils::{display_version, inspect_container};
pub use workouts::{execute_workouts, load_workouts, WorkoutSummary};
