//! Read generated MCAP files back.
//!
//! Used by the `inspect` command and by tests to check what was written.

use crate::utils::error::SinkError;
use log::debug;
use std::path::Path;

/// One message read back from a container
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub topic: String,
    pub schema_name: Option<String>,
    pub sequence: u32,
    pub log_time: u64,
    pub payload: Vec<u8>,
}

/// Per-channel statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    pub topic: String,
    pub schema_name: Option<String>,
    pub message_count: u64,
    pub first_log_time: u64,
    pub last_log_time: u64,
}

/// Summary of a container's contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSummary {
    /// Channels in order of their first message
    pub channels: Vec<ChannelStats>,
    pub total_messages: u64,
}

impl ContainerSummary {
    pub fn channel(&self, topic: &str) -> Option<&ChannelStats> {
        self.channels.iter().find(|c| c.topic == topic)
    }

    /// Earliest and latest log time across all channels
    pub fn time_range(&self) -> Option<(u64, u64)> {
        let start = self.channels.iter().map(|c| c.first_log_time).min()?;
        let end = self.channels.iter().map(|c| c.last_log_time).max()?;
        Some((start, end))
    }
}

/// Read every message of an MCAP file in file order
///
/// **Public** - useful for validation and testing
pub fn read_messages(input_path: impl AsRef<Path>) -> Result<Vec<StoredMessage>, SinkError> {
    let input_path = input_path.as_ref();
    debug!("Reading MCAP from: {}", input_path.display());

    let bytes = std::fs::read(input_path)?;
    let mut messages = Vec::new();

    for message in mcap::MessageStream::new(&bytes)? {
        let message = message?;
        messages.push(StoredMessage {
            topic: message.channel.topic.clone(),
            schema_name: message.channel.schema.as_ref().map(|s| s.name.clone()),
            sequence: message.sequence,
            log_time: message.log_time,
            payload: message.data.into_owned(),
        });
    }

    debug!("Read {} messages", messages.len());
    Ok(messages)
}

/// Summarize channels and message counts of an MCAP file
///
/// **Public** - backs the `inspect` command
pub fn summarize(input_path: impl AsRef<Path>) -> Result<ContainerSummary, SinkError> {
    let mut summary = ContainerSummary::default();

    for message in read_messages(input_path)? {
        summary.total_messages += 1;
        match summary
            .channels
            .iter_mut()
            .find(|c| c.topic == message.topic)
        {
            Some(stats) => {
                stats.message_count += 1;
                stats.first_log_time = stats.first_log_time.min(message.log_time);
                stats.last_log_time = stats.last_log_time.max(message.log_time);
            }
            None => summary.channels.push(ChannelStats {
                topic: message.topic,
                schema_name: message.schema_name,
                message_count: 1,
                first_log_time: message.log_time,
                last_log_time: message.log_time,
            }),
        }
    }

    Ok(summary)
}
