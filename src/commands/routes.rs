//! Routes command implementation.
//!
//! Apple Health names route files after the workout start, e.g.
//! `route_2025-03-22_7.05am.gpx`. The listing sorts on that encoded time.

use super::models::{listing_len, RoutesArgs};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A route file and the time encoded in its name
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFile {
    pub path: PathBuf,
    pub recorded: NaiveDateTime,
}

/// `route_YYYY-MM-DD_H.MM(am|pm).gpx`, as written by the Health app
static ROUTE_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^route_(\d{4})-(\d{2})-(\d{2})_(\d{1,2})\.(\d{2})(am|pm)\.gpx$").ok()
});

/// Parse the local start time from a route file name
///
/// Matching is case-insensitive. Returns `None` for anything else,
/// including impossible dates and times.
pub fn parse_route_datetime(filename: &str) -> Option<NaiveDateTime> {
    let caps = ROUTE_NAME.as_ref()?.captures(filename)?;
    let number = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();

    let year = i32::try_from(number(1)?).ok()?;
    let mut hour = number(4)?;
    let minute = number(5)?;
    let pm = caps.get(6)?.as_str().eq_ignore_ascii_case("pm");

    // 12-hour clock
    match (pm, hour) {
        (_, h) if !(1..=12).contains(&h) => return None,
        (true, h) if h < 12 => hour += 12,
        (false, 12) => hour = 0,
        _ => {}
    }

    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(date.and_time(time))
}

/// Route files in `dir`, most recent first
///
/// **Public** - used by the routes command
///
/// Files whose names do not follow the route naming scheme are skipped.
pub fn list_routes(dir: &Path) -> Result<Vec<RouteFile>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read routes directory {}", dir.display()))?;

    let mut routes = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        match parse_route_datetime(name) {
            Some(recorded) => routes.push(RouteFile {
                path: entry.path(),
                recorded,
            }),
            None => debug!("Skipping {}: not a route file name", name),
        }
    }

    routes.sort_by(|a, b| b.recorded.cmp(&a.recorded).then_with(|| a.path.cmp(&b.path)));
    Ok(routes)
}

/// Execute the routes command
///
/// **Public** - main entry point called from main.rs
pub fn execute_routes(args: RoutesArgs) -> Result<()> {
    let routes = list_routes(&args.dir)?;

    if routes.is_empty() {
        println!("No workout route files found in {}", args.dir.display());
        return Ok(());
    }

    let shown = listing_len(routes.len(), args.limit, args.all);
    println!("Most recent workout routes ({} of {}):", shown, routes.len());
    for (idx, route) in routes.iter().take(shown).enumerate() {
        println!(
            "{}) {}  {}",
            idx + 1,
            route.recorded.format("%Y-%m-%d %I:%M %p"),
            route.path.display()
        );
    }

    if shown < routes.len() {
        println!("Use --all to list every route");
    }

    Ok(())
}
