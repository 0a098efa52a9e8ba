//! Input parsing and format selection.
//!
//! This module handles:
//! - Choosing a parser for each input (by hint or extension)
//! - Parsing Apple Health exports, GPX routes and ECG recordings
//! - Reporting malformed input with file/line context

pub mod dispatch;
pub mod ecg;
pub mod gpx;
pub mod workout;
mod xml;

// Re-export main types
pub use dispatch::{resolve, InputKind};
pub use ecg::EcgParser;
pub use gpx::GpxParser;
pub use workout::WorkoutParser;

use crate::record::Record;
use crate::utils::error::{ParseError, SourceLocation};
use log::debug;
use std::path::Path;

/// Options that change what parsers keep
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// `sourceName` values whose export entries are dropped
    pub excluded_sources: Vec<String>,
}

/// Parser capability shared by every input format
///
/// Records come back in file-encounter order, which is not necessarily
/// timestamp order. Parsing is restartable by reading the file again.
pub trait FormatParser {
    /// Parse `content`, which was read from `origin`
    fn parse(&self, origin: &Path, content: &str) -> Result<Vec<Record>, ParseError>;
}

/// Read and parse one input file
///
/// **Public** - used by the convert command for every source
///
/// # Arguments
/// * `path` - Input file
/// * `kind` - Resolved format
/// * `options` - Parse options
///
/// # Errors
/// * `ParseError::Read` - File missing or not UTF-8
/// * Any format-specific `ParseError`
pub fn parse_file(
    path: &Path,
    kind: InputKind,
    options: &ParseOptions,
) -> Result<Vec<Record>, ParseError> {
    debug!("Reading {} input: {}", kind, path.display());

    // The handle is closed before parsing starts
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        location: SourceLocation::file(path),
        source,
    })?;

    kind.parser(options).parse(path, &content)
}
