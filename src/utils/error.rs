//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where in an input file a problem was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl SourceLocation {
    /// Location covering the whole file
    pub fn file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            line: None,
            column: None,
        }
    }

    pub fn at(path: &Path, line: u32, column: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            line: Some(line),
            column: Some(column),
        }
    }

    pub fn line(path: &Path, line: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            line: Some(line),
            column: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// Errors that can occur while parsing a recognized input format
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{location}: failed to read input: {source}")]
    Read {
        location: SourceLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("{location}: malformed XML: {source}")]
    Xml {
        location: SourceLocation,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{location}: malformed CSV: {source}")]
    Csv {
        location: SourceLocation,
        #[source]
        source: csv::Error,
    },

    #[error("{location}: expected a <{expected}> document, found <{found}>")]
    UnexpectedDocument {
        location: SourceLocation,
        expected: &'static str,
        found: String,
    },

    #[error("{location}: <{element}> is missing required field '{field}'")]
    MissingField {
        location: SourceLocation,
        element: String,
        field: String,
    },

    #[error("{location}: invalid {field} '{value}': {reason}")]
    InvalidValue {
        location: SourceLocation,
        field: String,
        value: String,
        reason: String,
    },
}

impl ParseError {
    /// Location of the offending input
    pub fn location(&self) -> &SourceLocation {
        match self {
            ParseError::Read { location, .. }
            | ParseError::Xml { location, .. }
            | ParseError::Csv { location, .. }
            | ParseError::UnexpectedDocument { location, .. }
            | ParseError::MissingField { location, .. }
            | ParseError::InvalidValue { location, .. } => location,
        }
    }
}

/// No parser resolves for the given path/hint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: unsupported input format{}", path.display(), describe_extension(extension.as_deref()))]
pub struct UnsupportedFormatError {
    pub path: PathBuf,
    pub extension: Option<String>,
}

fn describe_extension(extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!(" '.{}' (use --input-type to override)", ext),
        None => " (no file extension, use --input-type)".to_string(),
    }
}

/// Errors that can occur while opening or writing the output container
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Output file {0} already exists. Run with --overwrite to replace it")]
    OutputExists(PathBuf),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCAP encoding error: {0}")]
    Mcap(#[from] mcap::McapError),

    #[error("Failed to serialize message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Timestamp {0} cannot be represented as Unix nanoseconds")]
    TimestampOutOfRange(String),

    #[error("Channel {0} was never registered")]
    UnknownChannel(u16),

    #[error("Channel limit reached ({0} channels already registered)")]
    TooManyChannels(usize),
}

/// Why one input source produced no records
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedFormatError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
