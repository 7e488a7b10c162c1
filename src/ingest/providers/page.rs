// src/ingest/providers/page.rs
use anyhow::Result;
use metrics::counter;

use crate::config::Source;
use crate::ingest::types::{CandidateItem, Extract, NO_TITLE};
use crate::ingest::{normalize_text, truncate_chars};

/// How much of a page body is kept as the item summary.
pub const PAGE_SUMMARY_CHARS: usize = 2000;

/// Treats a whole page as one item named after its source.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageExtractor;

impl Extract for PageExtractor {
    fn extract(&self, source: &Source, raw: &[u8]) -> Result<Vec<CandidateItem>> {
        let body = String::from_utf8_lossy(raw);
        let title = if source.name.is_empty() {
            NO_TITLE.to_string()
        } else {
            source.name.clone()
        };
        counter!("monitor_items_fetched_total").increment(1);
        Ok(vec![CandidateItem {
            title,
            summary: normalize_text(truncate_chars(&body, PAGE_SUMMARY_CHARS)),
            link: source.url.clone(),
            published: String::new(),
        }])
    }
}
