//! The per-item ingestion pipeline.
//!
//! Stages run cheapest first so duplicates never pay for extraction, and
//! nothing pays for classification or summarization until all three dedup
//! signals have passed:
//!
//! 1. canonical URL hash (and block-list)
//! 2. feed title similarity
//! 3. fetch and extract
//! 4. minimum word count
//! 5. content fingerprint, then extracted title similarity
//! 6. classify, summarize
//! 7. insert-if-absent, then best-effort fingerprint and archive writes

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::TextModel;
use crate::canonical::{canonicalize_url, normalize_title, url_hash};
use crate::classify::{Classifier, HeuristicClassifier, ModelClassifier};
use crate::config::IngestConfig;
use crate::dedup::{DedupEngine, DedupVerdict};
use crate::error::{IngestError, Result};
use crate::extract::extract_article;
use crate::fetch::Fetcher;
use crate::geo::GeoDetector;
use crate::models::{ArticleRecord, FeedItem, IngestOutcome};
use crate::store::{ArticleStore, BlobStore, InsertResult, KvCache};
use crate::summary::cache::SummaryCache;
use crate::summary::{ExtractiveSummarizer, ModelSummarizer, Summarizer};
use crate::utils::{article_slug, word_count};

/// Classifier and summarizer for the configured mode: model-augmented when a
/// model is available, heuristic otherwise.
pub fn strategies(
    config: &IngestConfig,
    model: Option<Arc<dyn TextModel>>,
    cache: Arc<dyn KvCache>,
) -> (Arc<dyn Classifier>, Arc<dyn Summarizer>) {
    let heuristic = HeuristicClassifier::new(GeoDetector::new(&config.geo));
    let extractive = ExtractiveSummarizer::new(config.summary.clone());
    match model {
        Some(model) => (
            Arc::new(ModelClassifier::new(model.clone(), heuristic)),
            Arc::new(ModelSummarizer::new(
                model,
                extractive,
                Some(SummaryCache::new(cache, config.summary.cache_ttl_days)),
            )),
        ),
        None => (Arc::new(heuristic), Arc::new(extractive)),
    }
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArticleStore>,
    blobs: Arc<dyn BlobStore>,
    dedup: DedupEngine,
    classifier: Arc<dyn Classifier>,
    summarizer: Arc<dyn Summarizer>,
    min_word_count: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ArticleStore>,
        cache: Arc<dyn KvCache>,
        blobs: Arc<dyn BlobStore>,
        classifier: Arc<dyn Classifier>,
        summarizer: Arc<dyn Summarizer>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            fetcher,
            dedup: DedupEngine::new(store.clone(), cache, config.dedup.clone()),
            store,
            blobs,
            classifier,
            summarizer,
            min_word_count: config.ingest.min_word_count,
        }
    }

    /// Map a non-unique verdict to its outcome.
    fn short_circuit(verdict: DedupVerdict, hash: &str) -> Option<IngestOutcome> {
        match verdict {
            DedupVerdict::Unique => None,
            DedupVerdict::Duplicate { existing_id, reason } => Some(IngestOutcome::Duplicate {
                existing_id,
                url_hash: hash.to_string(),
                reason,
            }),
            DedupVerdict::Blocked => Some(IngestOutcome::Rejected {
                reason: "url is on the block list".into(),
            }),
        }
    }

    /// Run one feed item through every stage.
    ///
    /// Duplicates, block-list hits and insert conflicts come back as
    /// outcomes. Every other failure is an `Err`; only
    /// [`IngestError::is_fatal`] ones should stop the run.
    #[instrument(level = "info", skip_all, fields(url = %item.link))]
    pub async fn ingest_item(&self, item: &FeedItem) -> Result<IngestOutcome> {
        let link_hash = url_hash(&canonicalize_url(&item.link)?);
        if let Some(outcome) = Self::short_circuit(self.dedup.check_url(&link_hash).await?, &link_hash) {
            debug!(?outcome, "Feed link short-circuited");
            return Ok(outcome);
        }
        if !item.title.trim().is_empty() {
            let verdict = self.dedup.check_title(&item.title).await?;
            if let Some(outcome) = Self::short_circuit(verdict, &link_hash) {
                return Ok(outcome);
            }
        }

        let article = extract_article(self.fetcher.as_ref(), item).await?;
        let hash = url_hash(&article.canonical_url);
        if hash != link_hash {
            if let Some(outcome) = Self::short_circuit(self.dedup.check_url(&hash).await?, &hash) {
                return Ok(outcome);
            }
        }

        let words = word_count(&article.content_text);
        if words < self.min_word_count {
            return Err(IngestError::ShortContent {
                words,
                minimum: self.min_word_count,
            });
        }

        if let Some(outcome) = Self::short_circuit(self.dedup.check_fingerprint(&article.content_text).await, &hash) {
            return Ok(outcome);
        }
        if normalize_title(&article.title) != normalize_title(&item.title) {
            let verdict = self.dedup.check_title(&article.title).await?;
            if let Some(outcome) = Self::short_circuit(verdict, &hash) {
                return Ok(outcome);
            }
        }

        let classification = self.classifier.classify(&article).await;
        let summary = self.summarizer.summarize(&article).await;
        let mut record = ArticleRecord {
            id: String::new(),
            url_hash: hash.clone(),
            slug: article_slug(&article.title, &hash),
            article,
            classification,
            summary,
            ingested_at: Utc::now(),
        };

        let inserted = match self.store.insert_if_absent(record.clone()).await {
            Ok(inserted) => inserted,
            Err(IngestError::StorageConflict(detail)) => {
                return Ok(IngestOutcome::Duplicate {
                    existing_id: None,
                    url_hash: hash,
                    reason: format!("storage conflict: {detail}"),
                });
            }
            Err(e) => return Err(e),
        };
        match inserted {
            InsertResult::Inserted { id } => {
                info!(
                    %id,
                    category = record.classification.category.as_str(),
                    regions = ?record.classification.regions,
                    "Inserted article"
                );
                self.dedup.remember_fingerprint(&record.article.content_text, &id).await;
                record.id = id.clone();
                self.archive(&record).await;
                Ok(IngestOutcome::Inserted { id, url_hash: hash })
            }
            InsertResult::Conflict { existing_id } => Ok(IngestOutcome::Duplicate {
                existing_id: Some(existing_id),
                url_hash: hash,
                reason: "url hash inserted concurrently by another writer".into(),
            }),
        }
    }

    /// `ingest/{YYYY-MM-DD}/{content_hash}.json`. Failures are logged only.
    async fn archive(&self, record: &ArticleRecord) {
        let key = archive_key(record);
        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize record for archive");
                return;
            }
        };
        if let Err(e) = self.blobs.put(&key, bytes).await {
            warn!(error = %e, %key, "Archive write failed");
        }
    }
}

pub fn archive_key(record: &ArticleRecord) -> String {
    format!(
        "ingest/{}/{}.json",
        record.ingested_at.format("%Y-%m-%d"),
        record.summary.source_content_hash
    )
}
