//! Health Trace
//!
//! Converts Apple Health exports, GPX workout routes and ECG recordings
//! into a single MCAP container log for playback in Foxglove.
//!
//! This crate provides the core implementation for the
//! `health-trace` CLI tool.
//!
//! ## Getting Started
//!
//! Most users should install and use the CLI:
//!
//! ```bash
//! cargo install health-trace
//! health-trace convert -i apple_health_export/export.xml
//! ```
//!
//! Library users drive the same pipeline through [`commands::execute_convert`],
//! or compose [`parser`], [`emitter`] and [`output`] directly.

pub mod commands;
pub mod emitter;
pub mod output;
pub mod parser;
pub mod record;
pub mod utils;
