//! HTTP fetching behind a trait so every network-bound stage can be driven by
//! canned pages in tests.
//!
//! Fetches are the only suspension points in the pipeline. Each one is bounded
//! by the client timeout; failures are reported as
//! [`IngestError::Network`] and never retried inline.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::config::HttpConfig;
use crate::error::{IngestError, Result};
use crate::store::KvCache;

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// HTML by declared content type, or by sniffing the body when the
    /// server sent none.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.to_ascii_lowercase().contains("html"),
            None => {
                let head = self.body.trim_start();
                let head = head.get(..head.len().min(256)).unwrap_or(head).to_ascii_lowercase();
                head.starts_with("<!doctype html") || head.starts_with("<html")
            }
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// `reqwest`-backed fetcher with a descriptive User-Agent, per-request
/// timeout, and an optional best-effort response cache.
pub struct HttpFetcher {
    client: Client,
    cache: Option<Arc<dyn KvCache>>,
    cache_ttl: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig, cache: Option<Arc<dyn KvCache>>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            cache,
            cache_ttl: Duration::from_secs(config.fetch_cache_ttl_secs),
        })
    }

    async fn cached(&self, url: &str) -> Option<FetchedPage> {
        let cache = self.cache.as_ref()?;
        match cache.get(&format!("fetch:{url}")).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(%url, error = %e, "Fetch cache read failed; fetching live");
                None
            }
        }
    }

    async fn remember(&self, url: &str, page: &FetchedPage) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let Ok(raw) = serde_json::to_string(page) else {
            return;
        };
        if let Err(e) = cache.set(&format!("fetch:{url}"), &raw, self.cache_ttl).await {
            warn!(%url, error = %e, "Fetch cache write failed");
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        if let Some(page) = self.cached(url).await {
            debug!("Fetch cache hit");
            return Ok(page);
        }

        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| IngestError::network(url, e))?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            return Err(IngestError::network(url, format!("http status {status}")));
        }

        let body = resp.text().await.map_err(|e| IngestError::network(url, e))?;
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );

        let page = FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        };
        self.remember(url, &page).await;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: Option<&str>, body: &str) -> FetchedPage {
        FetchedPage {
            url: "https://example.com".into(),
            status: 200,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    #[test]
    fn test_is_html_by_content_type() {
        assert!(page(Some("text/html; charset=utf-8"), "").is_html());
        assert!(!page(Some("application/rss+xml"), "<rss/>").is_html());
    }

    #[test]
    fn test_is_html_sniffs_body_without_content_type() {
        assert!(page(None, "  <!DOCTYPE html><html></html>").is_html());
        assert!(!page(None, "Just a status update").is_html());
    }
}
