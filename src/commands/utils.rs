use crate::output::summarize;
use crate::utils::config::{MESSAGE_ENCODING, SCHEMA_ENCODING};
use anyhow::{Context, Result};
use chrono::DateTime;
use std::path::PathBuf;

/// Print channels, message counts and time range of an MCAP file
pub fn inspect_container(file_path: PathBuf) -> Result<()> {
    println!("Inspecting: {}", file_path.display());

    let summary = summarize(&file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    println!("✓ Valid MCAP file");
    println!("  Messages: {}", summary.total_messages);
    println!("  Channels: {}", summary.channels.len());

    if let Some((start, end)) = summary.time_range() {
        println!("  Start: {}", format_log_time(start));
        println!("  End:   {}", format_log_time(end));
    }

    for channel in &summary.channels {
        println!(
            "  {:<24} {:<24} {:>10} msgs",
            channel.topic,
            channel.schema_name.as_deref().unwrap_or("-"),
            channel.message_count
        );
    }

    Ok(())
}

fn format_log_time(nanos: u64) -> String {
    i64::try_from(nanos)
        .map(DateTime::from_timestamp_nanos)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|_| format!("{} ns", nanos))
}

/// Display version information
pub fn display_version() {
    println!("health-trace v{}", env!("CARGO_PKG_VERSION"));
    println!("Encoding: {} schemas, {} messages", SCHEMA_ENCODING, MESSAGE_ENCODING);
    println!();
    println!("Converts Apple Health exports, GPX routes and ECG recordings to MCAP.");
}
