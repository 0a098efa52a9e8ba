//! Utility modules for configuration and error handling.

pub mod error;
pub mod config;
pub mod time;

// Re-export commonly used error types for convenience
pub use error::{ParseError, SinkError, SourceError, SourceLocation, UnsupportedFormatError};
