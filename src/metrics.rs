//! Per-run counters and a bounded sample of rejection and duplicate reasons.
//!
//! Each source tallies into its own [`SourceTally`]; the orchestrator merges
//! tallies into the run's [`RunMetrics`] after every batch, so concurrent
//! source pipelines never share mutable state.

use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::models::IngestOutcome;
use crate::store::KvCache;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub processed: usize,
    pub inserted: usize,
    pub duplicate: usize,
    pub rejected: usize,
    pub low_word_discards: usize,
    pub source_errors: usize,
}

impl Counters {
    fn add(&mut self, other: &Counters) {
        self.processed += other.processed;
        self.inserted += other.inserted;
        self.duplicate += other.duplicate;
        self.rejected += other.rejected;
        self.low_word_discards += other.low_word_discards;
        self.source_errors += other.source_errors;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonSample {
    pub source: String,
    pub outcome: String,
    pub reason: String,
    pub url: Option<String>,
}

/// What one source contributed to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTally {
    pub source: String,
    pub counters: Counters,
    pub samples: Vec<ReasonSample>,
    sample_size: usize,
}

impl SourceTally {
    pub fn new(source: &str, sample_size: usize) -> Self {
        Self {
            source: source.to_string(),
            counters: Counters::default(),
            samples: Vec::new(),
            sample_size,
        }
    }

    fn sample(&mut self, outcome: &str, reason: String, url: Option<&str>) {
        if self.samples.len() < self.sample_size {
            self.samples.push(ReasonSample {
                source: self.source.clone(),
                outcome: outcome.to_string(),
                reason,
                url: url.map(str::to_string),
            });
        }
    }

    pub fn record_outcome(&mut self, url: &str, outcome: &IngestOutcome) {
        self.counters.processed += 1;
        match outcome {
            IngestOutcome::Inserted { .. } => self.counters.inserted += 1,
            IngestOutcome::Duplicate { reason, .. } => {
                self.counters.duplicate += 1;
                self.sample("duplicate", reason.clone(), Some(url));
            }
            IngestOutcome::Rejected { reason } => {
                self.counters.rejected += 1;
                self.sample("rejected", reason.clone(), Some(url));
            }
        }
    }

    /// A non-fatal item failure. Short content also counts as a low-word
    /// discard.
    pub fn record_item_error(&mut self, url: &str, error: &IngestError) {
        self.counters.processed += 1;
        self.counters.rejected += 1;
        if matches!(error, IngestError::ShortContent { .. }) {
            self.counters.low_word_discards += 1;
        }
        self.sample("rejected", error.to_string(), Some(url));
    }

    pub fn record_source_error(&mut self, error: &IngestError) {
        self.counters.source_errors += 1;
        self.sample("source_error", error.to_string(), None);
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub run_id: String,
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub sources: usize,
    #[serde(flatten)]
    pub counters: Counters,
    pub reasons: Vec<ReasonSample>,
    #[serde(skip)]
    sample_size: usize,
}

fn new_run_id(started_at: DateTime<Utc>) -> String {
    let suffix: u16 = rng().random();
    format!("{}-{suffix:04x}", started_at.format("%Y%m%dT%H%M%SZ"))
}

impl RunMetrics {
    pub fn new(trigger: &str, sample_size: usize) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: new_run_id(started_at),
            trigger: trigger.to_string(),
            started_at,
            finished_at: None,
            sources: 0,
            counters: Counters::default(),
            reasons: Vec::new(),
            sample_size,
        }
    }

    pub fn absorb(&mut self, tally: SourceTally) {
        self.sources += 1;
        self.counters.add(&tally.counters);
        let room = self.sample_size.saturating_sub(self.reasons.len());
        self.reasons.extend(tally.samples.into_iter().take(room));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        info!(
            run_id = %self.run_id,
            trigger = %self.trigger,
            sources = self.sources,
            processed = self.counters.processed,
            inserted = self.counters.inserted,
            duplicate = self.counters.duplicate,
            rejected = self.counters.rejected,
            low_word_discards = self.counters.low_word_discards,
            source_errors = self.counters.source_errors,
            "Run complete"
        );
    }

    pub fn key(&self) -> String {
        format!("ingest:metrics:{}", self.run_id)
    }
}

/// Store the run's metrics with a retention TTL. Best-effort.
pub async fn persist_metrics(cache: &dyn KvCache, metrics: &RunMetrics, retention_days: u64) {
    let json = match serde_json::to_string(metrics) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize run metrics");
            return;
        }
    };
    let ttl = Duration::from_secs(retention_days * 24 * 60 * 60);
    if let Err(e) = cache.set(&metrics.key(), &json, ttl).await {
        warn!(error = %e, key = %metrics.key(), "Failed to persist run metrics");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCache;

    #[test]
    fn test_tally_counts() {
        let mut tally = SourceTally::new("wkyt", 10);
        tally.record_outcome(
            "https://a",
            &IngestOutcome::Inserted {
                id: "1".into(),
                url_hash: "h".into(),
            },
        );
        tally.record_outcome(
            "https://b",
            &IngestOutcome::Duplicate {
                existing_id: None,
                url_hash: "h2".into(),
                reason: "content fingerprint matches a recent article".into(),
            },
        );
        tally.record_item_error("https://c", &IngestError::ShortContent { words: 12, minimum: 60 });
        tally.record_source_error(&IngestError::network("https://wkyt.com", "timeout"));

        assert_eq!(
            tally.counters,
            Counters {
                processed: 3,
                inserted: 1,
                duplicate: 1,
                rejected: 1,
                low_word_discards: 1,
                source_errors: 1,
            }
        );
        assert_eq!(tally.samples.len(), 3);
        assert_eq!(tally.samples[1].reason, "content too short: 12 words (minimum 60)");
    }

    #[test]
    fn test_reason_samples_are_bounded() {
        let mut metrics = RunMetrics::new("manual", 3);
        for name in ["a", "b"] {
            let mut tally = SourceTally::new(name, 3);
            for i in 0..3 {
                tally.record_outcome(&format!("https://{name}/{i}"), &IngestOutcome::Rejected { reason: "blocked".into() });
            }
            metrics.absorb(tally);
        }
        assert_eq!(metrics.counters.rejected, 6);
        assert_eq!(metrics.reasons.len(), 3);
        assert_eq!(metrics.sources, 2);
    }

    #[tokio::test]
    async fn test_persisted_under_run_key() {
        let cache = MemoryCache::new();
        let mut metrics = RunMetrics::new("scheduled:high", 5);
        metrics.finish();
        persist_metrics(&cache, &metrics, 7).await;
        let stored = cache.get(&metrics.key()).await.unwrap().unwrap();
        let parsed: RunMetrics = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.run_id, metrics.run_id);
        assert!(metrics.key().starts_with("ingest:metrics:"));
    }
}
