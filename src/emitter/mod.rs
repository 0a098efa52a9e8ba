//! Ordered emission of records into a sink.
//!
//! This module:
//! - Sorts each source's records into a run
//! - Merges runs into one timestamp-ordered stream
//! - Registers channels lazily and forwards encoded messages to the sink

pub mod channels;
pub mod merge;

// Re-export main types and functions
pub use channels::ChannelRegistry;
pub use merge::{merge_runs, OrderedMerge, SortedRun};

use crate::output::sink::RecordSink;
use crate::record::encode_payload;
use crate::utils::error::SinkError;
use crate::utils::time::to_unix_nanos;
use log::{debug, info};
use std::collections::BTreeMap;

/// What one emission wrote
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmitSummary {
    /// Topics in the order their channels were registered
    pub topics: Vec<String>,

    /// Messages written per topic
    pub counts: BTreeMap<String, u64>,

    /// Total messages written
    pub total: u64,

    /// First and last log time written, in Unix nanoseconds
    pub time_range: Option<(u64, u64)>,
}

impl EmitSummary {
    pub fn count(&self, topic: &str) -> u64 {
        self.counts.get(topic).copied().unwrap_or_default()
    }
}

/// Write every record of every run to `sink`, in global timestamp order
///
/// **Public** - main entry point used by the convert command
///
/// Runs are merged in the order given, which is also the tie-break order
/// for records sharing a timestamp. The sink is finished once the last
/// record is written.
///
/// # Arguments
/// * `runs` - One sorted run per successfully parsed source
/// * `sink` - Destination; owned exclusively for the duration of the call
///
/// # Returns
/// Per-topic message counts and channel registration order
///
/// # Errors
/// * `SinkError::TimestampOutOfRange` - A record predates the Unix epoch
/// * Any error raised by the sink
pub fn emit_ordered<S: RecordSink + ?Sized>(
    runs: Vec<SortedRun>,
    sink: &mut S,
) -> Result<EmitSummary, SinkError> {
    let expected: usize = runs.iter().map(SortedRun::len).sum();
    info!("Emitting {} records from {} sources", expected, runs.len());

    let mut registry = ChannelRegistry::new();
    let mut summary = EmitSummary::default();

    for (source, record) in merge_runs(runs) {
        let timestamp = record.timestamp();
        let log_time = to_unix_nanos(&timestamp)
            .ok_or_else(|| SinkError::TimestampOutOfRange(timestamp.to_rfc3339()))?;

        let kind = record.kind();
        let (channel, sequence) = registry.next_slot(&kind, sink)?;
        let payload = encode_payload(&record)?;
        sink.write_message(channel, sequence, log_time, &payload)?;

        *summary.counts.entry(kind.topic()).or_default() += 1;
        summary.total += 1;
        summary.time_range = match summary.time_range {
            Some((first, _)) => Some((first, log_time)),
            None => Some((log_time, log_time)),
        };

        if summary.total % 100_000 == 0 {
            debug!("Emitted {} records (last from source {})", summary.total, source);
        }
    }

    sink.finish()?;
    summary.topics = registry.topics().to_vec();

    info!(
        "Wrote {} messages on {} channels",
        summary.total,
        summary.topics.len()
    );
    Ok(summary)
}
