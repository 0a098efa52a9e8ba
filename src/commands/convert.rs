//! Convert command implementation.
//!
//! The convert command:
//! 1. Narrows the run to one workout when `--workout` is given
//! 2. Resolves and parses every input (plus referenced routes on request)
//! 3. Sorts each source and applies the time window
//! 4. Merges all sources into one ordered stream
//! 5. Writes the stream to an MCAP file (or to memory for dry runs)

use super::models::{ConvertArgs, RunReport, SourceOutcome};
use super::workouts::load_workouts;
use crate::emitter::{emit_ordered, EmitSummary, SortedRun};
use crate::output::{ensure_writable, McapSink, MemorySink};
use crate::parser::{parse_file, resolve, InputKind, ParseOptions};
use crate::record::Record;
use crate::utils::config::OUTPUT_EXTENSION;
use crate::utils::error::{ParseError, SourceError, SourceLocation};
use crate::utils::time::to_unix_nanos;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Execute the convert command
///
/// **Public** - main entry point called from main.rs
///
/// Sources that fail to resolve or parse are reported in the returned
/// [`RunReport`] and do not stop the run. The output file is only created
/// once at least one source has parsed.
///
/// # Arguments
/// * `args` - Convert command arguments
///
/// # Returns
/// Per-source outcomes and what was written
///
/// # Errors
/// * Invalid arguments
/// * Output exists and `--overwrite` was not given
/// * Any error while writing the container
pub fn execute_convert(args: ConvertArgs) -> Result<RunReport> {
    let start_time = Instant::now();
    validate_args(&args)?;
    let args = select_workout(args)?;

    let output = output_path(&args);
    if args.dry_run {
        info!("Dry run: nothing will be written");
    } else {
        // Refuse before spending time on parsing
        ensure_writable(&output, args.overwrite)
            .with_context(|| format!("Cannot write output {}", output.display()))?;
    }

    info!("Step 1/2: Parsing {} input(s)...", args.inputs.len());
    let (runs, sources) = collect_sources(&args);

    let mut report = RunReport {
        output: None,
        sources,
        emitted: None,
        dry_run: args.dry_run,
    };

    for failure in report.failures() {
        if let Some(error) = &failure.error {
            warn!("Skipping {}: {}", failure.path.display(), error);
        }
    }

    if runs.is_empty() {
        warn!("No input could be parsed; no output written");
        return Ok(report);
    }

    info!("Step 2/2: Writing {} source(s)...", runs.len());
    let summary = if args.dry_run {
        let mut sink = MemorySink::new();
        emit_ordered(runs, &mut sink).context("Failed to order records")?
    } else {
        let summary = write_container(runs, &output, args.overwrite)?;
        info!("✓ Output written to: {}", output.display());
        report.output = Some(output);
        summary
    };
    report.emitted = Some(summary);

    let elapsed = start_time.elapsed();
    info!("Convert completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Emit into a new MCAP file, removing it again if writing fails
fn write_container(runs: Vec<SortedRun>, output: &Path, overwrite: bool) -> Result<EmitSummary> {
    let mut sink = McapSink::create(output, overwrite)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    match emit_ordered(runs, &mut sink) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            drop(sink);
            if let Err(remove_err) = std::fs::remove_file(output) {
                debug!("Could not remove {}: {}", output.display(), remove_err);
            }
            Err(e).with_context(|| format!("Failed to write {}", output.display()))
        }
    }
}

/// A parsed explicit input waiting for filtering
struct ParsedInput {
    path: PathBuf,
    kind: InputKind,
    records: Vec<Record>,
}

/// Parse every source into a sorted run
///
/// **Public** - also used by tests to check ordering without a sink
///
/// Explicit inputs come first, in command-line order, followed by route
/// files discovered through `--follow-routes`. Runs are returned for
/// successful sources only; every source gets a [`SourceOutcome`].
///
/// Without an explicit window, an export given together with GPX routes is
/// narrowed to the time span the routes cover.
pub fn collect_sources(args: &ConvertArgs) -> (Vec<SortedRun>, Vec<SourceOutcome>) {
    let options = ParseOptions {
        excluded_sources: args.exclude_sources.clone(),
    };

    let mut runs = Vec::new();
    let mut outcomes = Vec::new();

    let mut parsed: Vec<Result<ParsedInput, SourceOutcome>> = Vec::new();
    for (index, path) in args.inputs.iter().enumerate() {
        let hint = args.hint_for(index);
        let kind = match resolve(path, hint) {
            Ok(kind) => kind,
            Err(e) => {
                parsed.push(Err(failed(path, None, false, e.into())));
                continue;
            }
        };

        parsed.push(match parse_file(path, kind, &options) {
            Ok(records) => Ok(ParsedInput {
                path: path.clone(),
                kind,
                records,
            }),
            Err(e) => Err(failed(path, Some(kind), false, e.into())),
        });
    }

    let span = route_span(args, &parsed);
    let mut seen: HashSet<PathBuf> = args.inputs.iter().cloned().collect();
    let mut routes: Vec<PathBuf> = Vec::new();

    for input in parsed {
        let input = match input {
            Ok(input) => input,
            Err(outcome) => {
                outcomes.push(outcome);
                continue;
            }
        };

        let mut run = into_run(input.records, args);
        if let (InputKind::Workout, Some((first, last))) = (input.kind, span) {
            let before = run.len();
            run.retain(|record| (first..=last).contains(&record.started_at()));
            info!(
                "  {}: kept {} of {} records inside the route span",
                input.path.display(),
                run.len(),
                before
            );
        }

        if args.follow_routes {
            for route in referenced_routes(&input.path, run.records()) {
                if seen.insert(route.clone()) {
                    routes.push(route);
                }
            }
        }

        info!("  {} ({}): {} records", input.path.display(), input.kind, run.len());
        admit(&input.path, input.kind, false, run, &mut runs, &mut outcomes);
    }

    if !routes.is_empty() {
        info!("Following {} workout route(s)", routes.len());
    }
    for route in routes {
        match parse_file(&route, InputKind::Gpx, &options) {
            Ok(records) => {
                let run = into_run(records, args);
                debug!("  route {}: {} fixes", route.display(), run.len());
                admit(&route, InputKind::Gpx, true, run, &mut runs, &mut outcomes);
            }
            Err(e) => outcomes.push(failed(&route, Some(InputKind::Gpx), true, e.into())),
        }
    }

    (runs, outcomes)
}

/// Time span covered by the explicit GPX inputs
///
/// Only used when an export and a route are combined without `--from`,
/// `--to` or `--workout`.
fn route_span(
    args: &ConvertArgs,
    parsed: &[Result<ParsedInput, SourceOutcome>],
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if args.from.is_some() || args.to.is_some() || args.workout.is_some() {
        return None;
    }

    let inputs: Vec<&ParsedInput> = parsed.iter().filter_map(|p| p.as_ref().ok()).collect();
    if !inputs.iter().any(|input| input.kind == InputKind::Workout) {
        return None;
    }

    let mut times = inputs
        .iter()
        .filter(|input| input.kind == InputKind::Gpx)
        .flat_map(|input| input.records.iter().map(Record::timestamp));
    let first = times.next()?;
    let span = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));

    info!(
        "Limiting export records to the route span {} .. {}",
        span.0.to_rfc3339(),
        span.1.to_rfc3339()
    );
    Some(span)
}

/// Record a parsed source, failing it when a timestamp cannot be logged
fn admit(
    path: &Path,
    kind: InputKind,
    from_route: bool,
    run: SortedRun,
    runs: &mut Vec<SortedRun>,
    outcomes: &mut Vec<SourceOutcome>,
) {
    match check_timestamps(path, &run) {
        Ok(()) => {
            outcomes.push(succeeded(path, kind, from_route, run.len()));
            runs.push(run);
        }
        Err(e) => outcomes.push(failed(path, Some(kind), from_route, e.into())),
    }
}

/// Every record must be representable as unsigned Unix nanoseconds
fn check_timestamps(path: &Path, run: &SortedRun) -> Result<(), ParseError> {
    match run
        .records()
        .iter()
        .map(Record::timestamp)
        .find(|timestamp| to_unix_nanos(timestamp).is_none())
    {
        Some(timestamp) => Err(ParseError::InvalidValue {
            location: SourceLocation::file(path),
            field: "timestamp".to_string(),
            value: timestamp.to_rfc3339(),
            reason: "outside the loggable range (1970 to 2554)".to_string(),
        }),
        None => Ok(()),
    }
}

/// Sort one source and drop records outside the time window
fn into_run(records: Vec<Record>, args: &ConvertArgs) -> SortedRun {
    let mut run = SortedRun::new(records);
    if args.from.is_some() || args.to.is_some() {
        let before = run.len();
        run.retain(|record| args.in_window(&record.timestamp()));
        debug!("Time window kept {} of {} records", run.len(), before);
    }
    run
}

/// Narrow a run to one workout of its export
///
/// **Public** - used by execute_convert for `--workout`
///
/// Workouts are numbered as the workouts command lists them (1 = most
/// recent). The selected session sets the time window, its route is
/// followed, and the default output is named after it.
///
/// # Errors
/// * No input resolves to an export
/// * The export cannot be read or has fewer workouts than requested
pub fn select_workout(mut args: ConvertArgs) -> Result<ConvertArgs> {
    let Some(number) = args.workout else {
        return Ok(args);
    };

    let export = args
        .inputs
        .iter()
        .enumerate()
        .find(|(index, path)| resolve(path, args.hint_for(*index)) == Ok(InputKind::Workout))
        .map(|(_, path)| path.clone())
        .context("--workout needs an Apple Health export among the inputs")?;

    let workouts = load_workouts(&export, false)?;
    let selected = number
        .checked_sub(1)
        .and_then(|index| workouts.get(index))
        .with_context(|| {
            format!(
                "Workout {} not found; {} lists {} workout(s)",
                number,
                export.display(),
                workouts.len()
            )
        })?;

    info!("Selected workout {}: {}", number, selected.describe());
    args.from = Some(selected.start_date);
    args.to = Some(selected.end_date);
    args.follow_routes = true;
    if args.output.is_none() {
        args.output = Some(args.output_dir.join(format!(
            "{}-{}.{}",
            selected.workout_type,
            selected.start_date.format("%Y-%m-%d_%H%M%S"),
            OUTPUT_EXTENSION
        )));
    }
    Ok(args)
}

/// Route files referenced by the workouts of one export
///
/// Export paths are relative to the directory holding `export.xml`.
fn referenced_routes(export: &Path, records: &[Record]) -> Vec<PathBuf> {
    let base = export.parent().unwrap_or_else(|| Path::new(""));
    records
        .iter()
        .filter_map(Record::as_workout)
        .filter_map(|session| session.route.as_ref())
        .map(|route| base.join(route))
        .collect()
}

fn succeeded(path: &Path, kind: InputKind, from_route: bool, records: usize) -> SourceOutcome {
    SourceOutcome {
        path: path.to_path_buf(),
        kind: Some(kind),
        records,
        from_route,
        error: None,
    }
}

fn failed(path: &Path, kind: Option<InputKind>, from_route: bool, error: SourceError) -> SourceOutcome {
    SourceOutcome {
        path: path.to_path_buf(),
        kind,
        records: 0,
        from_route,
        error: Some(error),
    }
}

/// Output file for a run
///
/// **Public** - exposed so callers can report the path before converting
///
/// `--output` wins; otherwise the first input's stem under `output_dir`,
/// suffixed `-combined` when more than one input is given.
pub fn output_path(args: &ConvertArgs) -> PathBuf {
    if let Some(output) = &args.output {
        return output.clone();
    }

    let stem = args
        .inputs
        .first()
        .and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "health".to_string());

    let name = if args.inputs.len() > 1 {
        format!("{}-combined.{}", stem, OUTPUT_EXTENSION)
    } else {
        format!("{}.{}", stem, OUTPUT_EXTENSION)
    };
    args.output_dir.join(name)
}

/// Validate convert arguments
///
/// **Public** - can be called before execute_convert for early validation
///
/// # Arguments
/// * `args` - Arguments to validate
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &ConvertArgs) -> Result<()> {
    if args.inputs.is_empty() {
        anyhow::bail!("At least one --input is required");
    }

    if args.input_types.len() > args.inputs.len() {
        anyhow::bail!(
            "{} --input-type values given for {} input(s); each type pairs with one input",
            args.input_types.len(),
            args.inputs.len()
        );
    }

    if let Some(output) = &args.output {
        if output.as_os_str().is_empty() {
            anyhow::bail!("--output cannot be empty");
        }
    }

    if let (Some(from), Some(to)) = (args.from, args.to) {
        if from > to {
            anyhow::bail!("--from ({}) is after --to ({})", from, to);
        }
    }

    if let Some(number) = args.workout {
        if number == 0 {
            anyhow::bail!("--workout counts from 1 (the most recent workout)");
        }
        if args.from.is_some() || args.to.is_some() {
            anyhow::bail!("--workout sets its own time window; drop --from/--to");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn args_for(inputs: &[&str]) -> ConvertArgs {
        ConvertArgs {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&args_for(&["route.gpx"])).is_ok());
    }

    #[test]
    fn test_validate_args_no_inputs() {
        assert!(validate_args(&args_for(&[])).is_err());
    }

    #[test]
    fn test_validate_args_more_types_than_inputs() {
        let args = ConvertArgs {
            input_types: vec![InputKind::Gpx, InputKind::Ecg],
            ..args_for(&["route.gpx"])
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_inverted_window() {
        let args = ConvertArgs {
            from: Some(Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            ..args_for(&["route.gpx"])
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_workout_numbering() {
        let args = ConvertArgs {
            workout: Some(0),
            ..args_for(&["export.xml"])
        };
        assert!(validate_args(&args).is_err());

        let args = ConvertArgs {
            workout: Some(1),
            from: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            ..args_for(&["export.xml"])
        };
        assert!(validate_args(&args).is_err());

        let args = ConvertArgs {
            workout: Some(1),
            ..args_for(&["export.xml"])
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_select_workout_needs_an_export() {
        let args = ConvertArgs {
            workout: Some(1),
            ..args_for(&["route.gpx", "ecg.csv"])
        };
        assert!(select_workout(args).is_err());
    }

    #[test]
    fn test_pre_epoch_source_is_rejected() {
        let old = Utc.with_ymd_and_hms(1965, 3, 22, 17, 0, 0).unwrap();
        let recent = Utc.with_ymd_and_hms(2025, 3, 22, 17, 0, 0).unwrap();
        let sample = |at| {
            Record::from(crate::record::ScalarSample::new(
                at,
                crate::record::ScalarKind::EcgVoltage,
                1.0,
                None,
            ))
        };

        let path = Path::new("ecg.csv");
        assert!(check_timestamps(path, &SortedRun::new(vec![sample(recent)])).is_ok());

        let err = check_timestamps(path, &SortedRun::new(vec![sample(recent), sample(old)]))
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { ref field, .. } if field == "timestamp"));
        assert_eq!(err.location().path, PathBuf::from("ecg.csv"));
    }

    #[test]
    fn test_output_path_single_input() {
        let args = ConvertArgs {
            output_dir: PathBuf::from("out"),
            ..args_for(&["data/route_2025-03-22_7.05am.gpx"])
        };
        assert_eq!(
            output_path(&args),
            PathBuf::from("out/route_2025-03-22_7.05am.mcap")
        );
    }

    #[test]
    fn test_output_path_combined() {
        let args = ConvertArgs {
            output_dir: PathBuf::from("out"),
            ..args_for(&["export.xml", "ecg.csv"])
        };
        assert_eq!(output_path(&args), PathBuf::from("out/export-combined.mcap"));
    }

    #[test]
    fn test_output_path_explicit() {
        let args = ConvertArgs {
            output: Some(PathBuf::from("run.mcap")),
            ..args_for(&["export.xml", "ecg.csv"])
        };
        assert_eq!(output_path(&args), PathBuf::from("run.mcap"));
    }

    #[test]
    fn test_hint_pairs_positionally() {
        let args = ConvertArgs {
            input_types: vec![InputKind::Gpx],
            ..args_for(&["a.xml", "b.csv"])
        };
        assert_eq!(args.hint_for(0), Some(InputKind::Gpx));
        assert_eq!(args.hint_for(1), None);
    }
}
