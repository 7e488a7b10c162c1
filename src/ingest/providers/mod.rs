// src/ingest/providers/mod.rs
pub mod feed;
pub mod page;

use crate::config::SourceKind;
use crate::ingest::types::Extract;

pub use feed::{parse_feed, FeedExtractor};
pub use page::{PageExtractor, PAGE_SUMMARY_CHARS};

/// Extraction capability for a resolved source kind.
pub fn extractor_for(kind: SourceKind) -> &'static dyn Extract {
    match kind {
        SourceKind::Feed => &FeedExtractor,
        SourceKind::Page => &PageExtractor,
    }
}
