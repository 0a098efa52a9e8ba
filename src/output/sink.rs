//! Sink contract between the emitter and the container writer.
//!
//! The emitter only ever registers channels, writes timestamped messages and
//! finishes the output. It never looks at the container's byte layout.

use crate::utils::error::SinkError;

/// Identifier handed out by a sink when a channel is registered
pub type ChannelId = u16;

/// Channel description: topic plus the JSON Schema of its messages
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub topic: String,
    pub schema_name: String,
    pub schema: serde_json::Value,
}

/// Append-only destination for ordered records
///
/// Opening the output is the job of each implementation's constructor.
pub trait RecordSink {
    /// Register a channel and return its id
    fn register_channel(&mut self, spec: &ChannelSpec) -> Result<ChannelId, SinkError>;

    /// Write one message on a registered channel
    ///
    /// `sequence` counts messages per channel, starting at 0.
    fn write_message(
        &mut self,
        channel: ChannelId,
        sequence: u32,
        log_time: u64,
        payload: &[u8],
    ) -> Result<(), SinkError>;

    /// Flush and close the output; no writes are accepted afterwards
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// A message captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMessage {
    pub channel: ChannelId,
    pub sequence: u32,
    pub log_time: u64,
    pub payload: Vec<u8>,
}

/// Sink that keeps everything in memory
///
/// Used for `--dry-run` and by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub channels: Vec<ChannelSpec>,
    pub messages: Vec<CapturedMessage>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic of a registered channel
    pub fn topic(&self, channel: ChannelId) -> Option<&str> {
        self.channels
            .get(usize::from(channel))
            .map(|spec| spec.topic.as_str())
    }
}

impl RecordSink for MemorySink {
    fn register_channel(&mut self, spec: &ChannelSpec) -> Result<ChannelId, SinkError> {
        let id = ChannelId::try_from(self.channels.len())
            .map_err(|_| SinkError::TooManyChannels(self.channels.len()))?;
        self.channels.push(spec.clone());
        Ok(id)
    }

    fn write_message(
        &mut self,
        channel: ChannelId,
        sequence: u32,
        log_time: u64,
        payload: &[u8],
    ) -> Result<(), SinkError> {
        if usize::from(channel) >= self.channels.len() {
            return Err(SinkError::UnknownChannel(channel));
        }
        self.messages.push(CapturedMessage {
            channel,
            sequence,
            log_time,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
