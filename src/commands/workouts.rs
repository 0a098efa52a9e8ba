//! Workouts command implementation.
//!
//! Lists the workouts of an Apple Health export, most recent first. Parsing
//! a full export is slow, so summaries are cached as JSON next to it.

use super::models::{listing_len, WorkoutsArgs};
use crate::parser::{parse_file, InputKind, ParseOptions};
use crate::record::{Record, WorkoutSession};
use crate::utils::config::WORKOUT_CACHE_FILE;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Cached view of one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub workout_type: String,
    pub source_name: Option<String>,
    pub duration: Option<f64>,
    pub duration_unit: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub route: Option<PathBuf>,
}

impl From<&WorkoutSession> for WorkoutSummary {
    fn from(session: &WorkoutSession) -> Self {
        Self {
            workout_type: session.workout_type.clone(),
            source_name: session.source_name.clone(),
            duration: session.duration.as_ref().map(|d| d.value),
            duration_unit: session.duration.as_ref().map(|d| d.unit.clone()),
            start_date: session.start,
            end_date: session.end,
            route: session.route.clone(),
        }
    }
}

impl WorkoutSummary {
    /// One listing line, e.g. `Running (Apple Watch) - 2025-03-22 17:15 UTC (31 min)`
    pub fn describe(&self) -> String {
        let source = self.source_name.as_deref().unwrap_or("unknown source");
        let duration = match (self.duration, self.duration_unit.as_deref()) {
            (Some(value), Some(unit)) => format!(" ({} {})", value.round(), unit),
            (Some(value), None) => format!(" ({})", value.round()),
            _ => String::new(),
        };
        let route = if self.route.is_some() { " [route]" } else { "" };
        format!(
            "{} ({}) - {}{}{}",
            self.workout_type,
            source,
            self.start_date.format("%Y-%m-%d %H:%M UTC"),
            duration,
            route
        )
    }
}

/// Cache file used for an export
pub fn cache_path(export: &Path) -> PathBuf {
    export
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(WORKOUT_CACHE_FILE)
}

/// Workout summaries of an export, most recent first
///
/// **Public** - used by the workouts command
///
/// The cache is used when it parses and is at least as new as the export.
/// Otherwise (or with `refresh`) the export is parsed and the cache rewritten.
///
/// # Errors
/// * Export missing or malformed
pub fn load_workouts(export: &Path, refresh: bool) -> Result<Vec<WorkoutSummary>> {
    let cache = cache_path(export);

    if refresh {
        info!("Refreshing workout cache {}", cache.display());
    } else if let Some(workouts) = read_cache(&cache, export) {
        info!("Loaded {} workouts from cache {}", workouts.len(), cache.display());
        return Ok(workouts);
    }

    info!("Building workout cache from {}", export.display());
    let workouts = build_summaries(export)?;

    match serde_json::to_string_pretty(&workouts) {
        Ok(json) => match fs::write(&cache, json) {
            Ok(()) => debug!("Wrote {} workouts to {}", workouts.len(), cache.display()),
            Err(e) => warn!("Could not write cache {}: {}", cache.display(), e),
        },
        Err(e) => warn!("Could not serialize workout cache: {}", e),
    }

    Ok(workouts)
}

/// Cached summaries, or None when the cache must be rebuilt
fn read_cache(cache: &Path, export: &Path) -> Option<Vec<WorkoutSummary>> {
    let cache_modified = fs::metadata(cache).and_then(|m| m.modified()).ok()?;

    if let Ok(export_modified) = fs::metadata(export).and_then(|m| m.modified()) {
        if export_modified > cache_modified {
            info!("Export is newer than cache {}", cache.display());
            return None;
        }
    }

    let content = fs::read_to_string(cache).ok()?;
    match serde_json::from_str(&content) {
        Ok(workouts) => Some(workouts),
        Err(e) => {
            warn!("Invalid cache file {}: {}", cache.display(), e);
            None
        }
    }
}

fn build_summaries(export: &Path) -> Result<Vec<WorkoutSummary>> {
    let records = parse_file(export, InputKind::Workout, &ParseOptions::default())
        .with_context(|| format!("Failed to read workouts from {}", export.display()))?;

    let mut workouts: Vec<WorkoutSummary> = records
        .iter()
        .filter_map(Record::as_workout)
        .map(WorkoutSummary::from)
        .collect();
    workouts.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(workouts)
}

/// Execute the workouts command
///
/// **Public** - main entry point called from main.rs
pub fn execute_workouts(args: WorkoutsArgs) -> Result<()> {
    let workouts = load_workouts(&args.export, args.refresh)?;

    if workouts.is_empty() {
        println!("No workouts found in {}", args.export.display());
        return Ok(());
    }

    let shown = listing_len(workouts.len(), args.limit, args.all);
    println!("Most recent workouts ({} of {}):", shown, workouts.len());
    for (idx, workout) in workouts.iter().take(shown).enumerate() {
        println!("{}) {}", idx + 1, workout.describe());
    }

    if shown < workouts.len() {
        println!("Use --all to list every workout");
    }

    Ok(())
}
