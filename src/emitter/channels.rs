//! Topic -> channel id registry.
//!
//! A topic is registered with the sink the first time a record of its kind
//! is emitted, and never again within the same run.

use crate::output::sink::{ChannelId, RecordSink};
use crate::record::{channel_spec, RecordKind};
use crate::utils::error::SinkError;
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

struct ChannelState {
    id: ChannelId,
    next_sequence: u32,
}

/// Channels registered during one run
#[derive(Default)]
pub struct ChannelRegistry {
    by_topic: HashMap<String, ChannelState>,
    order: Vec<String>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel id and next sequence number for a record kind
    ///
    /// Registers the channel with `sink` on first use.
    pub fn next_slot<S: RecordSink + ?Sized>(
        &mut self,
        kind: &RecordKind,
        sink: &mut S,
    ) -> Result<(ChannelId, u32), SinkError> {
        let state = match self.by_topic.entry(kind.topic()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let id = sink.register_channel(&channel_spec(kind))?;
                debug!("Channel {} -> {}", entry.key(), id);
                self.order.push(entry.key().clone());
                entry.insert(ChannelState {
                    id,
                    next_sequence: 0,
                })
            }
        };

        let sequence = state.next_sequence;
        state.next_sequence = state.next_sequence.wrapping_add(1);
        Ok((state.id, sequence))
    }

    /// Topics in registration order
    pub fn topics(&self) -> &[String] {
        &self.order
    }
}
