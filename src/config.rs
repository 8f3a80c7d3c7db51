//! YAML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working heuristic-only configuration. The hand-tuned constants (title
//! similarity threshold, high-ambiguity city list) live here so deployments
//! can adjust them without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

use crate::error::{IngestError, Result};
use crate::models::Source;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    pub http: HttpConfig,
    pub dedup: DedupConfig,
    pub geo: GeoConfig,
    pub summary: SummaryConfig,
    pub ingest: RunConfig,
    /// Absent means pure-heuristic mode.
    pub model: Option<ModelConfig>,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub fetch_cache_ttl_secs: u64,
    /// Hosts exempt from the robots.txt check (explicit syndication grants).
    pub trusted_hosts: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "regional_news_ingest/{} (+https://github.com/graves/regional_news_ingest)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 20,
            fetch_cache_ttl_secs: 600,
            trusted_hosts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    pub title_similarity_threshold: f64,
    pub recent_title_window: usize,
    pub fingerprint_words: usize,
    pub fingerprint_ttl_days: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.88,
            recent_title_window: 300,
            fingerprint_words: 150,
            fingerprint_ttl_days: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Replaces the built-in high-ambiguity city list when non-empty.
    pub high_ambiguity_cities: Vec<String>,
    /// Characters inspected on each side of a place-name match.
    pub disqualification_window: usize,
    /// Words on each side of a city mention searched for locative cues.
    pub cue_window_words: usize,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            high_ambiguity_cities: Vec::new(),
            disqualification_window: 150,
            cue_window_words: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub fallback_ratio: f64,
    pub fallback_min_words: usize,
    pub fallback_max_words: usize,
    pub cache_ttl_days: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            fallback_ratio: 0.45,
            fallback_min_words: 40,
            fallback_max_words: 220,
            cache_ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Sources processed concurrently per batch.
    pub batch_size: usize,
    /// Sources covered by one scheduled invocation.
    pub rotation_window: usize,
    pub per_source_limit: usize,
    pub min_word_count: usize,
    pub metrics_retention_days: u64,
    pub reason_sample_size: usize,
    /// Directory for raw payload archival; disabled when absent.
    pub archive_dir: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            rotation_window: 12,
            per_source_limit: 10,
            min_word_count: 60,
            metrics_retention_days: 7,
            reason_sample_size: 25,
            archive_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "qwen/qwen3-8b".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout_secs: 120,
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl IngestConfig {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: IngestConfig =
            serde_yaml::from_str(raw).map_err(|e| IngestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ingest.batch_size == 0 {
            return Err(IngestError::Config("ingest.batch_size must be at least 1".into()));
        }
        if self.ingest.rotation_window == 0 {
            return Err(IngestError::Config("ingest.rotation_window must be at least 1".into()));
        }
        let t = self.dedup.title_similarity_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(IngestError::Config(format!(
                "dedup.title_similarity_threshold must be within 0..=1, got {t}"
            )));
        }
        let summary = &self.summary;
        if !(0.0..=1.0).contains(&summary.fallback_ratio) {
            return Err(IngestError::Config(format!(
                "summary.fallback_ratio must be within 0..=1, got {}",
                summary.fallback_ratio
            )));
        }
        if summary.fallback_min_words > summary.fallback_max_words {
            return Err(IngestError::Config(format!(
                "summary.fallback_min_words ({}) exceeds summary.fallback_max_words ({})",
                summary.fallback_min_words, summary.fallback_max_words
            )));
        }
        Ok(())
    }
}

/// Load configuration from a YAML file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_config(path: impl AsRef<Path>) -> Result<IngestConfig> {
    let raw = tokio::fs::read_to_string(path.as_ref()).await?;
    let config = IngestConfig::from_yaml(&raw)?;
    info!(
        sources = config.sources.len(),
        model = config.model.is_some(),
        "Loaded configuration"
    );
    Ok(config)
}
