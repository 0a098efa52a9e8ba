//! Common record model shared by parsers, emitter and sink.
//!
//! This module defines:
//! - Location fixes, scalar samples and workout sessions
//! - Record kinds and the channel each kind maps to
//! - JSON payloads and schemas written to the container

pub mod message;
pub mod types;

// Re-export main types
pub use message::{channel_spec, encode_payload};
pub use types::{
    LocationSample, Quantity, Record, RecordKind, ScalarKind, ScalarSample, WorkoutSession,
    WorkoutStatistic,
};
