// src/notify/mod.rs
pub mod slack;

use anyhow::Result;

use crate::records::RunRecord;
use crate::stamp::RunStamp;

pub use slack::SlackNotifier;

/// Item lines carried by one message; the rest only go to the record file.
pub const MAX_NOTIFY_LINES: usize = 45;

/// Outbound channel for the end-of-run summary.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, message: &str) -> Result<()>;
}

/// `• [category] source: title` with the link on an indented second line.
pub fn summary_line(r: &RunRecord) -> String {
    format!("• [{}] {}: {}\n  {}", r.category, r.source, r.title, r.link)
}

/// Header with stamp and count, then at most [`MAX_NOTIFY_LINES`] item lines.
pub fn compose_message(title: &str, stamp: &RunStamp, records: &[RunRecord]) -> String {
    let header = format!(
        "{} ({} {}) — {} new items",
        title,
        stamp.label(),
        stamp.zone(),
        records.len()
    );
    let mut lines = Vec::with_capacity(records.len().min(MAX_NOTIFY_LINES) + 1);
    lines.push(header);
    lines.extend(records.iter().take(MAX_NOTIFY_LINES).map(summary_line));
    lines.join("\n")
}
