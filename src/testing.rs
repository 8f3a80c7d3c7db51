//! Test fakes for the network and model seams.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::TextModel;
use crate::error::{IngestError, Result};
use crate::fetch::{FetchedPage, Fetcher};
use crate::models::{ArticleRecord, Category, Classification, ExtractedArticle, SummaryResult};

/// Serves canned pages by exact URL; anything else is a network error.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, FetchedPage>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, url: &str, content_type: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                url: url.to_string(),
                status: 200,
                content_type: Some(content_type.to_string()),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.with(url, "text/html; charset=utf-8", body)
    }

    pub fn xml(self, url: &str, body: &str) -> Self {
        self.with(url, "application/xml", body)
    }

    pub fn text(self, url: &str, body: &str) -> Self {
        self.with(url, "text/plain", body)
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn was_fetched(&self, url: &str) -> bool {
        self.fetch_count(url) > 0
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| IngestError::network(url, "404 Not Found"))
    }
}

/// Returns a fixed reply, optionally after failing a number of times.
pub struct MockModel {
    failures_left: AtomicUsize,
    reply: String,
    calls: AtomicUsize,
}

impl MockModel {
    pub fn replying(reply: &str) -> Self {
        Self::failing_then(0, reply)
    }

    pub fn failing_then(failures: usize, reply: &str) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextModel for MockModel {
    async fn ask(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(IngestError::Model("mock model unavailable".into()));
        }
        Ok(self.reply.clone())
    }
}

/// A WYMT-style article page about a Pike County budget vote.
pub const STORY_HTML: &str = r#"<html><head>
<title>Pike County fiscal court approves road budget | WYMT</title>
<link rel="canonical" href="https://www.wymt.com/2025/05/06/pike-county-budget/?utm_source=rss">
</head><body><article><h1>Pike County fiscal court approves road budget</h1>
<p>PIKEVILLE, Ky. (WYMT) - The Pike County fiscal court approved a road budget on Monday night after a long public hearing at the courthouse in Pikeville.</p>
<p>Magistrates said repairs to county roads damaged by spring flooding would take most of the money, and new equipment for the road department would take the rest.</p>
<p>Several residents spoke during the meeting and asked the court to set aside money for the animal shelter and for the senior citizens center in the county.</p>
<p>The judge-executive said the court would revisit the shelter request when bids for the road projects come back next month.</p>
</article></body></html>"#;

/// A minimal persisted record for store and dedup tests.
pub fn sample_record(url_hash: &str, title: &str) -> ArticleRecord {
    let published = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
    ArticleRecord {
        id: String::new(),
        url_hash: url_hash.to_string(),
        slug: format!("sample-{url_hash}"),
        article: ExtractedArticle {
            canonical_url: format!("https://example.com/news/{url_hash}"),
            source_url: "https://example.com".into(),
            title: title.to_string(),
            author: None,
            published_at: published,
            content_text: "Body text.".into(),
            content_html: "<p>Body text.</p>".into(),
            classification_lead: "Body text.".into(),
            image_url: None,
        },
        classification: Classification {
            category: Category::StateGeneral,
            is_state: true,
            is_national: false,
            primary_region: None,
            regions: Vec::new(),
            locality: None,
        },
        summary: SummaryResult {
            summary: "Body text.".into(),
            short_description: "Body text.".into(),
            word_count: 2,
            source_content_hash: "hash".into(),
        },
        ingested_at: published,
    }
}
