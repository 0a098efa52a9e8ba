//! Input format selection.
//!
//! Maps an input path plus an optional type hint to exactly one parser.
//! Resolution is a pure function of `(path, hint)`.

use super::ecg::EcgParser;
use super::gpx::GpxParser;
use super::workout::WorkoutParser;
use super::{FormatParser, ParseOptions};
use crate::utils::error::UnsupportedFormatError;
use std::fmt;
use std::path::Path;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum InputKind {
    /// Apple Health `export.xml`
    Workout,
    /// GPX route file
    Gpx,
    /// ECG CSV recording
    Ecg,
}

impl InputKind {
    /// Format implied by a file extension (case-insensitive)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xml" => Some(InputKind::Workout),
            "gpx" => Some(InputKind::Gpx),
            "csv" => Some(InputKind::Ecg),
            _ => None,
        }
    }

    /// Build the parser for this format
    pub fn parser(self, options: &ParseOptions) -> Box<dyn FormatParser> {
        match self {
            InputKind::Workout => Box::new(WorkoutParser::new(options)),
            InputKind::Gpx => Box::new(GpxParser),
            InputKind::Ecg => Box::new(EcgParser),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InputKind::Workout => "workout",
            InputKind::Gpx => "gpx",
            InputKind::Ecg => "ecg",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve the format of an input
///
/// **Public** - main entry point for format selection
///
/// # Arguments
/// * `path` - Input file path
/// * `hint` - Explicit format; authoritative when given
///
/// # Returns
/// The format to parse the input as
///
/// # Errors
/// * `UnsupportedFormatError` - No hint and the extension is not recognized
pub fn resolve(path: &Path, hint: Option<InputKind>) -> Result<InputKind, UnsupportedFormatError> {
    if let Some(kind) = hint {
        return Ok(kind);
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string);

    extension
        .as_deref()
        .and_then(InputKind::from_extension)
        .ok_or_else(|| UnsupportedFormatError {
            path: path.to_path_buf(),
            extension,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_extension() {
        assert_eq!(resolve(Path::new("export.xml"), None), Ok(InputKind::Workout));
        assert_eq!(resolve(Path::new("route.GPX"), None), Ok(InputKind::Gpx));
        assert_eq!(resolve(Path::new("ecg_2025-03-22.csv"), None), Ok(InputKind::Ecg));
    }

    #[test]
    fn test_hint_is_authoritative() {
        assert_eq!(
            resolve(Path::new("route.xml"), Some(InputKind::Gpx)),
            Ok(InputKind::Gpx)
        );
        assert_eq!(
            resolve(Path::new("data.foo"), Some(InputKind::Ecg)),
            Ok(InputKind::Ecg)
        );
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let err = resolve(Path::new("notes.foo"), None).unwrap_err();
        assert_eq!(err.extension.as_deref(), Some("foo"));

        let err = resolve(Path::new("README"), None).unwrap_err();
        assert_eq!(err.extension, None);
    }
}
