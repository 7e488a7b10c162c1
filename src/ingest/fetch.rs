// src/ingest/fetch.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::types::Fetch;

const USER_AGENT: &str = concat!("feed-monitor/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP GET with a bounded wait per request.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building http client")?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))
    }
}

#[async_trait::async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;
        Ok(body.to_vec())
    }

    /// Decoded with the charset from `Content-Type`, UTF-8 otherwise.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.get(url)
            .await?
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }
}
