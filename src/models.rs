//! Data models shared across the ingestion pipeline.
//!
//! - [`Source`]: a publisher root URL with its scheduling tier
//! - [`FeedItem`]: a raw entry discovered from a feed, sitemap or homepage
//! - [`ExtractedArticle`]: cleaned article content with a canonical URL
//! - [`Classification`]: topic plus state/county relevance
//! - [`SummaryResult`]: validated summary and short description
//! - [`ArticleRecord`]: the persisted union of the above
//! - [`IngestOutcome`]: what happened to one candidate item
//!
//! Field names serialize as camelCase to match the article store's JSON
//! columns and the run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often a source is polled by the scheduled trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    #[default]
    Normal,
    Low,
}

impl std::str::FromStr for PriorityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(PriorityTier::High),
            "normal" => Ok(PriorityTier::Normal),
            "low" => Ok(PriorityTier::Low),
            other => Err(format!("unknown priority tier: {other}")),
        }
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriorityTier::High => "high",
            PriorityTier::Normal => "normal",
            PriorityTier::Low => "low",
        };
        f.write_str(s)
    }
}

/// Publisher category, used to keep batches from being monopolised by
/// low-value feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Newspaper,
    Broadcast,
    Government,
    Aggregator,
    Social,
}

impl SourceKind {
    pub fn is_low_value(self) -> bool {
        matches!(self, SourceKind::Aggregator | SourceKind::Social)
    }
}

/// A publisher root URL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tier: PriorityTier,
    #[serde(default)]
    pub kind: SourceKind,
}

impl Source {
    pub fn new(url: &str, tier: PriorityTier, kind: SourceKind) -> Self {
        Self {
            url: url.to_string(),
            name: None,
            tier,
            kind,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// A raw entry from a feed, sitemap, or discovered homepage link.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Article content after extraction and URL canonicalization.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedArticle {
    /// HTTPS, lowercase host, no tracking params, no fragment, no trailing slash.
    pub canonical_url: String,
    pub source_url: String,
    pub title: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub content_text: String,
    pub content_html: String,
    /// Plain text (never markup) used by the classifier, capped near 4000 chars.
    pub classification_lead: String,
    pub image_url: Option<String>,
}

/// Closed topic enum. Variant order is not the matching priority; see
/// `classify::CATEGORY_PRIORITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Obituaries,
    Weather,
    Schools,
    Sports,
    Crime,
    Government,
    Health,
    Business,
    StateGeneral,
    National,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Obituaries,
        Category::Weather,
        Category::Schools,
        Category::Sports,
        Category::Crime,
        Category::Government,
        Category::Health,
        Category::Business,
        Category::StateGeneral,
        Category::National,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Obituaries => "obituaries",
            Category::Weather => "weather",
            Category::Schools => "schools",
            Category::Sports => "sports",
            Category::Crime => "crime",
            Category::Government => "government",
            Category::Health => "health",
            Category::Business => "business",
            Category::StateGeneral => "state_general",
            Category::National => "national",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Only the closed set of snake_case names; anything else is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: Category,
    pub is_state: bool,
    pub is_national: bool,
    /// First region in `regions`, if any.
    pub primary_region: Option<String>,
    /// County names in detection order, deduplicated.
    pub regions: Vec<String>,
    /// Lowercased city name when a city was detected.
    pub locality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub summary: String,
    pub short_description: String,
    pub word_count: usize,
    pub source_content_hash: String,
}

/// The persisted article. `url_hash` is the unique key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// Assigned by the store on insert; empty before that.
    #[serde(default)]
    pub id: String,
    pub url_hash: String,
    pub slug: String,
    #[serde(flatten)]
    pub article: ExtractedArticle,
    #[serde(flatten)]
    pub classification: Classification,
    #[serde(flatten)]
    pub summary: SummaryResult,
    pub ingested_at: DateTime<Utc>,
}

/// What happened to a single candidate item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Inserted {
        id: String,
        url_hash: String,
    },
    Duplicate {
        existing_id: Option<String>,
        url_hash: String,
        reason: String,
    },
    Rejected {
        reason: String,
    },
}

impl IngestOutcome {
    pub fn url_hash(&self) -> Option<&str> {
        match self {
            IngestOutcome::Inserted { url_hash, .. } | IngestOutcome::Duplicate { url_hash, .. } => {
                Some(url_hash)
            }
            IngestOutcome::Rejected { .. } => None,
        }
    }
}
