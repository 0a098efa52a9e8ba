//! MCAP container output.
//!
//! Wraps `mcap::Writer` behind the [`RecordSink`] contract. Schemas are JSON
//! Schema documents and every message is JSON, which is what Foxglove expects
//! for self-describing channels.

use super::sink::{ChannelId, ChannelSpec, RecordSink};
use super::validate_path;
use crate::utils::config::{MESSAGE_ENCODING, SCHEMA_ENCODING};
use crate::utils::error::SinkError;
use log::{debug, info};
use mcap::records::MessageHeader;
use mcap::{Channel, Schema};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fail early when the output exists and may not be replaced
///
/// **Public** - lets the convert command refuse before doing any parsing
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<(), SinkError> {
    validate_path(path)?;
    if path.exists() && !overwrite {
        return Err(SinkError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// MCAP file sink
pub struct McapSink {
    writer: mcap::Writer<'static, BufWriter<File>>,
    path: PathBuf,
    messages: u64,
}

impl McapSink {
    /// Open the output for writing
    ///
    /// **Public** - the only way to obtain an MCAP sink
    ///
    /// # Arguments
    /// * `path` - Output file
    /// * `overwrite` - Replace an existing file instead of failing
    ///
    /// # Errors
    /// * `SinkError::OutputExists` - File exists and `overwrite` is false
    /// * `SinkError::InvalidPath` - Empty path or a directory
    /// * `SinkError::Io` / `SinkError::Mcap` - File could not be created
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self, SinkError> {
        let path = path.as_ref();
        info!("Opening MCAP output: {}", path.display());

        ensure_writable(path, overwrite)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directories: {}", parent.display());
                std::fs::create_dir_all(parent).map_err(|e| {
                    SinkError::InvalidPath(format!(
                        "Cannot create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let file = options.open(path).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => SinkError::OutputExists(path.to_path_buf()),
            _ => SinkError::Io(e),
        })?;

        let writer = mcap::Writer::new(BufWriter::new(file))?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            messages: 0,
        })
    }

    pub fn message_count(&self) -> u64 {
        self.messages
    }
}

impl RecordSink for McapSink {
    fn register_channel(&mut self, spec: &ChannelSpec) -> Result<ChannelId, SinkError> {
        let schema = Schema {
            name: spec.schema_name.clone(),
            encoding: SCHEMA_ENCODING.to_string(),
            data: Cow::Owned(serde_json::to_vec(&spec.schema)?),
        };

        let channel = Channel {
            topic: spec.topic.clone(),
            schema: Some(Arc::new(schema)),
            message_encoding: MESSAGE_ENCODING.to_string(),
            metadata: BTreeMap::new(),
        };

        let id = self.writer.add_channel(&channel)?;
        debug!("Registered channel {} as id {}", spec.topic, id);
        Ok(id)
    }

    fn write_message(
        &mut self,
        channel: ChannelId,
        sequence: u32,
        log_time: u64,
        payload: &[u8],
    ) -> Result<(), SinkError> {
        self.writer.write_to_known_channel(
            &MessageHeader {
                channel_id: channel,
                sequence,
                log_time,
                publish_time: log_time,
            },
            payload,
        )?;
        self.messages += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.finish()?;
        info!(
            "MCAP output closed: {} ({} messages)",
            self.path.display(),
            self.messages
        );
        Ok(())
    }
}
