// src/ingest/types.rs
use anyhow::Result;

use crate::config::Source;

pub const NO_TITLE: &str = "(no title)";

/// One normalized item produced by a fetch. Has no identity until fingerprinted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    pub title: String,     // never empty, falls back to NO_TITLE
    pub summary: String,   // normalized text
    pub link: String,      // may be empty
    pub published: String, // verbatim from the source, may be empty
}

impl CandidateItem {
    /// Text the keyword filter matches against.
    pub fn match_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// Turns one raw response body into candidates. Implemented once per source kind.
pub trait Extract: Send + Sync {
    fn extract(&self, source: &Source, raw: &[u8]) -> Result<Vec<CandidateItem>>;
}

/// Retrieves the body of a source URL.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Body bytes as served, left for the parser to decode.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Body decoded to text. The default assumes UTF-8.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
