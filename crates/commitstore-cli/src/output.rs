//! Output formatting utilities.

use chrono::{DateTime, SecondsFormat};
use commitstore_core::CommittedRecord;

/// Formats a commit as one JSON line.
pub fn format_json(record: &CommittedRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

/// Formats a commit as a simple table row.
pub fn format_table_row(record: &CommittedRecord) -> String {
    format!(
        "{:<34} {:<24} {:>8} {:<24} {}",
        truncate(&record.commit_id.to_string(), 34),
        truncate(record.aggregate_id.as_str(), 24),
        record.version,
        format_millis(record.committed_at),
        record.events.len()
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!(
        "{:<34} {:<24} {:>8} {:<24} {}",
        "COMMIT_ID", "AGGREGATE", "VERSION", "COMMITTED_AT", "EVENTS"
    );
    println!("{}", "-".repeat(100));
}

/// Renders epoch milliseconds as RFC 3339, or the raw number if out of range.
fn format_millis(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_render_as_utc() {
        assert_eq!(format_millis(1_704_164_645_067), "2024-01-02T03:04:05.067Z");
        assert_eq!(format_millis(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
