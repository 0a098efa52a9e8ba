//! Health Trace CLI
//!
//! Converts Apple Health data (workouts, GPX routes, ECG recordings)
//! into MCAP files for Foxglove.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;

use health_trace::commands::{
    display_version, execute_convert, execute_routes, execute_workouts, inspect_container,
    ConvertArgs, RoutesArgs, RunReport, RunStatus, WorkoutsArgs,
};
use health_trace::parser::InputKind;
use health_trace::utils::config::{
    DEFAULT_EXPORT_FILE, DEFAULT_LIST_LIMIT, DEFAULT_OUTPUT_DIR, DEFAULT_ROUTES_DIR,
};
use health_trace::utils::time::{parse_window_end, parse_window_start};

/// Health Trace - Apple Health data to MCAP
#[derive(Parser, Debug)]
#[command(name = "health-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert one or more inputs into a single MCAP file
    Convert {
        /// Input file (repeatable)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Input format; the n-th value applies to the n-th --input
        #[arg(short = 't', long = "input-type", value_enum)]
        input_types: Vec<InputKind>,

        /// Output file (defaults to a name derived from the first input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for the default output name
        #[arg(long, env = "HEALTH_TRACE_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,

        /// Drop export entries recorded by this source (repeatable)
        #[arg(long = "exclude-source")]
        exclude_sources: Vec<String>,

        /// Keep records at or after this time
        #[arg(long, value_parser = parse_window_start)]
        from: Option<DateTime<Utc>>,

        /// Keep records at or before this time
        #[arg(long, value_parser = parse_window_end)]
        to: Option<DateTime<Utc>>,

        /// Also convert route files referenced by workouts in the export
        #[arg(long)]
        follow_routes: bool,

        /// Convert only the N-th workout as listed by `workouts` (1 = most recent)
        #[arg(short, long, value_name = "N", conflicts_with_all = ["from", "to"])]
        workout: Option<usize>,

        /// Parse and order everything without writing a file
        #[arg(long)]
        dry_run: bool,
    },

    /// List workouts in an Apple Health export
    Workouts {
        /// Path to export.xml
        #[arg(short, long, env = "HEALTH_TRACE_EXPORT", default_value = DEFAULT_EXPORT_FILE)]
        export: PathBuf,

        /// Number of workouts to show
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,

        /// Show every workout
        #[arg(long)]
        all: bool,

        /// Rebuild the workout cache
        #[arg(long)]
        refresh: bool,
    },

    /// List workout route files, most recent first
    Routes {
        /// Directory holding route_*.gpx files
        #[arg(short, long, default_value = DEFAULT_ROUTES_DIR)]
        dir: PathBuf,

        /// Number of routes to show
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,

        /// Show every route
        #[arg(long)]
        all: bool,
    },

    /// Summarize the channels of an MCAP file
    Inspect {
        /// Path to MCAP file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Convert {
            inputs,
            input_types,
            output,
            output_dir,
            overwrite,
            exclude_sources,
            from,
            to,
            follow_routes,
            workout,
            dry_run,
        } => {
            let args = ConvertArgs {
                inputs,
                input_types,
                output,
                output_dir,
                overwrite,
                exclude_sources,
                from,
                to,
                follow_routes,
                workout,
                dry_run,
            };

            let report = execute_convert(args)?;
            print_report(&report);
            return Ok(ExitCode::from(report.status().exit_code()));
        }

        Commands::Workouts {
            export,
            limit,
            all,
            refresh,
        } => {
            execute_workouts(WorkoutsArgs {
                export,
                limit,
                all,
                refresh,
            })?;
        }

        Commands::Routes { dir, limit, all } => {
            execute_routes(RoutesArgs { dir, limit, all })?;
        }

        Commands::Inspect { file } => {
            inspect_container(file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Print the outcome of a convert run
///
/// **Private** - internal command implementation
fn print_report(report: &RunReport) {
    for source in &report.sources {
        match &source.error {
            None => println!("  ✓ {} ({} records)", source.path.display(), source.records),
            Some(error) => eprintln!("  ✗ {}", error),
        }
    }

    if let Some(summary) = &report.emitted {
        for topic in &summary.topics {
            println!("  {:<24} {:>10} msgs", topic, summary.count(topic));
        }
    }

    match (report.status(), &report.output) {
        (RunStatus::Complete, Some(path)) => println!("Saved to {}", path.display()),
        (RunStatus::Partial, Some(path)) => {
            println!("Saved to {} (some inputs were skipped)", path.display())
        }
        (RunStatus::NoOutput, _) => eprintln!("No input could be converted; nothing written"),
        (_, None) if report.dry_run => println!("Dry run complete; nothing written"),
        (_, None) => {}
    }
}
