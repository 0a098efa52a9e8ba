//! Output side of the pipeline.
//!
//! This module handles:
//! - The sink contract the emitter writes through
//! - MCAP container output
//! - Reading containers back for inspection

pub mod container;
pub mod inspect;
pub mod sink;

// Re-export main types and functions
pub use container::{ensure_writable, McapSink};
pub use inspect::{read_messages, summarize, ContainerSummary, StoredMessage};
pub use sink::{ChannelId, ChannelSpec, MemorySink, RecordSink};

use crate::utils::error::SinkError;
use std::path::Path;

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), SinkError> {
    if path.as_os_str().is_empty() {
        return Err(SinkError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(SinkError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
