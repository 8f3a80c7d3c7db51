//! Article summaries.
//!
//! [`ExtractiveSummarizer`] is deterministic and always available.
//! [`ModelSummarizer`] asks a [`TextModel`], runs the reply through
//! [`validate::validate_summary`], and falls back to the extractive summary
//! on any failure. Validated model summaries are cached by source content
//! hash (see [`cache`]).

pub mod cache;
pub mod validate;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::TextModel;
use crate::canonical::content_hash;
use crate::config::SummaryConfig;
use crate::models::{ExtractedArticle, SummaryResult};
use crate::utils::{collapse_whitespace, truncate_for_log, word_count};
use cache::{CachedSummary, SummaryCache};
use validate::{ensure_terminal, sentence_ends, truncate_to_words, validate_summary};

pub const SHORT_DESCRIPTION_MAX_CHARS: usize = 160;
/// Characters of article body sent to the model.
const MODEL_SOURCE_CHARS: usize = 12_000;

/// Leading sentences covering about `fallback_ratio` of the body's words,
/// clamped to the configured bounds.
pub fn extractive_summary(text: &str, config: &SummaryConfig) -> String {
    let flat = collapse_whitespace(text);
    let words = word_count(&flat);
    if words == 0 {
        return String::new();
    }
    // Inverted bounds resolve to the upper one.
    let target = ((words as f64 * config.fallback_ratio).round() as usize)
        .max(config.fallback_min_words)
        .min(config.fallback_max_words)
        .min(words);
    truncate_to_words(&flat, target)
}

/// First sentence of `summary`, at most 160 characters. Longer sentences are
/// cut at a word boundary and end with "...".
pub fn short_description(summary: &str) -> String {
    let text = summary.trim();
    let first = sentence_ends(text)
        .first()
        .map(|&end| &text[..end])
        .unwrap_or(text)
        .trim();
    if first.chars().count() <= SHORT_DESCRIPTION_MAX_CHARS {
        return first.to_string();
    }
    let budget = SHORT_DESCRIPTION_MAX_CHARS - 3;
    let cut: String = first.chars().take(budget).collect();
    let at_boundary = first.chars().nth(budget).is_some_and(char::is_whitespace);
    let kept = match cut.rfind(char::is_whitespace) {
        Some(i) if !at_boundary && i > 0 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}...", kept.trim_end_matches([',', ';', ':', '.']).trim_end())
}

fn summary_result(summary: String, article: &ExtractedArticle) -> SummaryResult {
    SummaryResult {
        short_description: short_description(&summary),
        word_count: word_count(&article.content_text),
        source_content_hash: content_hash(&article.content_text),
        summary,
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Never fails: every strategy ends on the extractive path.
    async fn summarize(&self, article: &ExtractedArticle) -> SummaryResult;
}

#[derive(Debug, Clone, Default)]
pub struct ExtractiveSummarizer {
    config: SummaryConfig,
}

impl ExtractiveSummarizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    pub fn summarize_now(&self, article: &ExtractedArticle) -> SummaryResult {
        let mut summary = extractive_summary(&article.content_text, &self.config);
        if summary.is_empty() {
            summary = ensure_terminal(&article.title);
        }
        summary_result(summary, article)
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, article: &ExtractedArticle) -> SummaryResult {
        self.summarize_now(article)
    }
}

fn summary_prompt(article: &ExtractedArticle) -> String {
    let body: String = article.content_text.chars().take(MODEL_SOURCE_CHARS).collect();
    let words = word_count(&body);
    format!(
        "Summarize this local news article in {low} to {high} words.\n\
         Use complete sentences. Do not add facts, names or numbers that are not in the article.\n\
         Reply with the summary text only.\n\n\
         Title: {title}\n\n{body}\n",
        low = words * validate::BAND_LOW_PERCENT / 100,
        high = (words * validate::BAND_HIGH_PERCENT / 100).max(validate::MIN_SUMMARY_WORDS),
        title = article.title,
    )
}

pub struct ModelSummarizer {
    model: Arc<dyn TextModel>,
    fallback: ExtractiveSummarizer,
    cache: Option<SummaryCache>,
}

impl ModelSummarizer {
    pub fn new(model: Arc<dyn TextModel>, fallback: ExtractiveSummarizer, cache: Option<SummaryCache>) -> Self {
        Self { model, fallback, cache }
    }

    async fn from_cache(&self, hash: &str, article: &ExtractedArticle) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.lookup(hash).await? {
            CachedSummary::Fresh(summary) => Some(summary),
            CachedSummary::Stale(summary) => match validate_summary(&summary, &article.content_text) {
                Ok(summary) => {
                    cache.refresh(hash, article.published_at).await;
                    Some(summary)
                }
                Err(e) => {
                    debug!(error = %e, "Cached summary no longer validates");
                    None
                }
            },
        }
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&article.title, 80)))]
    async fn summarize(&self, article: &ExtractedArticle) -> SummaryResult {
        let hash = content_hash(&article.content_text);
        if let Some(summary) = self.from_cache(&hash, article).await {
            debug!("Summary cache hit");
            return summary_result(summary, article);
        }

        let generated = match self.model.ask(&summary_prompt(article)).await {
            Ok(reply) => validate_summary(&reply, &article.content_text),
            Err(e) => Err(e),
        };
        match generated {
            Ok(summary) => {
                info!(words = word_count(&summary), "Model summary accepted");
                if let Some(cache) = &self.cache {
                    cache.store(&hash, &summary, article.published_at).await;
                }
                summary_result(summary, article)
            }
            Err(e) => {
                warn!(error = %e, "Model summary rejected; using extractive fallback");
                self.fallback.summarize_now(article)
            }
        }
    }
}
