use crate::emitter::EmitSummary;
use crate::parser::InputKind;
use crate::utils::config::{
    DEFAULT_EXPORT_FILE, DEFAULT_LIST_LIMIT, DEFAULT_OUTPUT_DIR, DEFAULT_ROUTES_DIR,
};
use crate::utils::error::SourceError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Arguments for the convert command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// Input files, in the order given on the command line
    pub inputs: Vec<PathBuf>,

    /// Format hints; the n-th hint applies to the n-th input
    pub input_types: Vec<InputKind>,

    /// Explicit output path (overrides `output_dir`)
    pub output: Option<PathBuf>,

    /// Directory for the default output name
    pub output_dir: PathBuf,

    /// Replace an existing output file
    pub overwrite: bool,

    /// Export `sourceName` values to drop
    pub exclude_sources: Vec<String>,

    /// Inclusive lower bound on record timestamps
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound on record timestamps
    pub to: Option<DateTime<Utc>>,

    /// Also ingest route files referenced by parsed workouts
    pub follow_routes: bool,

    /// Convert only this workout of the export (1 = most recent)
    pub workout: Option<usize>,

    /// Parse and order everything, write nothing
    pub dry_run: bool,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            input_types: Vec::new(),
            output: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            overwrite: false,
            exclude_sources: Vec::new(),
            from: None,
            to: None,
            follow_routes: false,
            workout: None,
            dry_run: false,
        }
    }
}

impl ConvertArgs {
    /// Format hint paired with the input at `index`
    pub fn hint_for(&self, index: usize) -> Option<InputKind> {
        self.input_types.get(index).copied()
    }

    pub fn in_window(&self, timestamp: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *timestamp >= from)
            && self.to.map_or(true, |to| *timestamp <= to)
    }
}

/// Result of parsing one source
#[derive(Debug)]
pub struct SourceOutcome {
    pub path: PathBuf,

    /// Resolved format, if resolution succeeded
    pub kind: Option<InputKind>,

    /// Records kept after filtering
    pub records: usize,

    /// True for route files pulled in through `--follow-routes`
    pub from_route: bool,

    pub error: Option<SourceError>,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Overall outcome of a convert run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every source parsed and was written
    Complete,
    /// Some sources failed; the rest were written
    Partial,
    /// No source parsed; nothing was written
    NoOutput,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Complete => 0,
            RunStatus::Partial => 2,
            RunStatus::NoOutput => 1,
        }
    }
}

/// Everything a convert run did
#[derive(Debug)]
pub struct RunReport {
    /// Output file, when one was written
    pub output: Option<PathBuf>,

    pub sources: Vec<SourceOutcome>,

    /// Present whenever the emit phase ran (including dry runs)
    pub emitted: Option<EmitSummary>,

    pub dry_run: bool,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        let failed = self.sources.iter().filter(|s| !s.is_ok()).count();
        match (&self.emitted, failed) {
            (None, _) => RunStatus::NoOutput,
            (Some(_), 0) => RunStatus::Complete,
            (Some(_), _) => RunStatus::Partial,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|s| !s.is_ok())
    }
}

/// Arguments for the workouts command
#[derive(Debug, Clone)]
pub struct WorkoutsArgs {
    /// Apple Health `export.xml`
    pub export: PathBuf,

    /// Entries to show unless `all` is set
    pub limit: usize,

    pub all: bool,

    /// Rebuild the cache even when it is fresh
    pub refresh: bool,
}

impl Default for WorkoutsArgs {
    fn default() -> Self {
        Self {
            export: PathBuf::from(DEFAULT_EXPORT_FILE),
            limit: DEFAULT_LIST_LIMIT,
            all: false,
            refresh: false,
        }
    }
}

/// Arguments for the routes command
#[derive(Debug, Clone)]
pub struct RoutesArgs {
    /// Directory holding `route_*.gpx` files
    pub dir: PathBuf,
    pub limit: usize,
    pub all: bool,
}

impl Default for RoutesArgs {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_ROUTES_DIR),
            limit: DEFAULT_LIST_LIMIT,
            all: false,
        }
    }
}

/// Number of entries a listing should show
pub fn listing_len(total: usize, limit: usize, all: bool) -> usize {
    if all {
        total
    } else {
        total.min(limit)
    }
}
