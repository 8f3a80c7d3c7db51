//! Three-signal duplicate detection.
//!
//! 1. exact canonical-URL hash against the corpus and the block-list
//! 2. normalized title similarity against a window of recent records
//! 3. fingerprint of the leading body words against a short-TTL set
//!
//! Each check is independent so the pipeline can run the cheap ones before
//! paying for extraction, and the fingerprint check before classification.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::canonical::{content_fingerprint, normalize_title};
use crate::config::DedupConfig;
use crate::error::Result;
use crate::store::{ArticleStore, KvCache};

const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "from", "have", "been", "were", "will", "what", "when", "where",
    "which", "while", "after", "before", "about", "into", "over", "under", "their", "there",
    "they", "your", "just", "more", "most", "some", "than", "then", "them", "these", "those",
    "here", "how", "update", "updated", "breaking", "watch", "live", "video", "photos",
];

#[derive(Debug, Clone, PartialEq)]
pub enum DedupVerdict {
    Unique,
    Duplicate {
        existing_id: Option<String>,
        reason: String,
    },
    /// The url hash is on the takedown list.
    Blocked,
}

impl DedupVerdict {
    pub fn is_unique(&self) -> bool {
        matches!(self, DedupVerdict::Unique)
    }
}

/// Closest recent title, kept for diagnostics even below the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleMatch {
    pub existing_id: String,
    pub existing_title: String,
    pub similarity: f64,
}

/// First word of at least four letters that is not a stop word.
pub fn first_meaningful_word(normalized: &str) -> Option<&str> {
    normalized.split_whitespace().find(|w| {
        w.chars().filter(|c| c.is_alphabetic()).count() >= 4 && !STOP_WORDS.contains(w)
    })
}

/// `1 - edit_distance / max_len` over normalized titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Pairs that cannot reach `threshold`: different leading meaningful words,
/// or a length ratio already under the threshold (similarity never exceeds
/// it).
fn quick_reject(a: &str, b: &str, threshold: f64) -> bool {
    if first_meaningful_word(a) != first_meaningful_word(b) {
        return true;
    }
    let (la, lb) = (a.chars().count(), b.chars().count());
    let longer = la.max(lb);
    if longer == 0 {
        return false;
    }
    (la.min(lb) as f64 / longer as f64) < threshold
}

/// Best match for `title` among `(id, title)` pairs.
pub fn best_title_match(
    title: &str,
    recent: &[(String, String)],
    threshold: f64,
) -> Option<TitleMatch> {
    let candidate = normalize_title(title);
    if candidate.is_empty() {
        return None;
    }
    let mut best: Option<TitleMatch> = None;
    for (id, existing) in recent {
        let normalized = normalize_title(existing);
        if quick_reject(&candidate, &normalized, threshold) {
            continue;
        }
        let similarity = title_similarity(&candidate, &normalized);
        if best.as_ref().is_none_or(|b| similarity > b.similarity) {
            best = Some(TitleMatch {
                existing_id: id.clone(),
                existing_title: existing.clone(),
                similarity,
            });
        }
    }
    best
}

pub struct DedupEngine {
    store: Arc<dyn ArticleStore>,
    cache: Arc<dyn KvCache>,
    config: DedupConfig,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn ArticleStore>, cache: Arc<dyn KvCache>, config: DedupConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    fn fingerprint_key(fingerprint: &str) -> String {
        format!("fp:{fingerprint}")
    }

    /// Signal 1. Store errors propagate: an unreachable store is fatal.
    pub async fn check_url(&self, url_hash: &str) -> Result<DedupVerdict> {
        if self.store.is_blocked(url_hash).await? {
            return Ok(DedupVerdict::Blocked);
        }
        Ok(match self.store.find_by_hash(url_hash).await? {
            Some(existing_id) => DedupVerdict::Duplicate {
                existing_id: Some(existing_id),
                reason: "url hash already ingested".into(),
            },
            None => DedupVerdict::Unique,
        })
    }

    /// Signal 2.
    pub async fn check_title(&self, title: &str) -> Result<DedupVerdict> {
        let recent = self.store.recent_titles(self.config.recent_title_window).await?;
        let threshold = self.config.title_similarity_threshold;
        let Some(best) = best_title_match(title, &recent, threshold) else {
            return Ok(DedupVerdict::Unique);
        };
        debug!(
            similarity = best.similarity,
            existing = %best.existing_title,
            "Closest recent title"
        );
        if best.similarity >= threshold {
            return Ok(DedupVerdict::Duplicate {
                reason: format!(
                    "title similarity {:.2} with \"{}\"",
                    best.similarity, best.existing_title
                ),
                existing_id: Some(best.existing_id),
            });
        }
        Ok(DedupVerdict::Unique)
    }

    /// Signal 3. Cache failures count as a miss.
    pub async fn check_fingerprint(&self, body: &str) -> DedupVerdict {
        let fingerprint = content_fingerprint(body, self.config.fingerprint_words);
        match self.cache.get(&Self::fingerprint_key(&fingerprint)).await {
            Ok(Some(existing_id)) => DedupVerdict::Duplicate {
                existing_id: (!existing_id.is_empty()).then_some(existing_id),
                reason: "content fingerprint matches a recent article".into(),
            },
            Ok(None) => DedupVerdict::Unique,
            Err(e) => {
                warn!(error = %e, "Fingerprint lookup failed; skipping signal");
                DedupVerdict::Unique
            }
        }
    }

    /// Record an inserted article's fingerprint. Best-effort.
    pub async fn remember_fingerprint(&self, body: &str, record_id: &str) {
        let fingerprint = content_fingerprint(body, self.config.fingerprint_words);
        let ttl = Duration::from_secs(self.config.fingerprint_ttl_days * 24 * 60 * 60);
        if let Err(e) = self
            .cache
            .set(&Self::fingerprint_key(&fingerprint), record_id, ttl)
            .await
        {
            warn!(error = %e, "Fingerprint write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryArticleStore, MemoryCache};
    use crate::testing::sample_record;

    const THRESHOLD: f64 = 0.88;

    fn engine() -> (Arc<MemoryArticleStore>, DedupEngine) {
        let store = Arc::new(MemoryArticleStore::new());
        let engine = DedupEngine::new(store.clone(), Arc::new(MemoryCache::new()), DedupConfig::default());
        (store, engine)
    }

    #[test]
    fn test_branding_suffix_scores_above_threshold() {
        let a = normalize_title("Flooding closes several roads across Eastern Kentucky on Tuesday");
        let b = normalize_title("Flooding closes several roads across Eastern Kentucky on Tuesday - WKYT");
        assert!(title_similarity(&a, &b) >= THRESHOLD);
        assert!(!quick_reject(&a, &b, THRESHOLD));
    }

    #[test]
    fn test_unrelated_titles_score_low() {
        let a = normalize_title("Lexington council approves new parks budget");
        let b = normalize_title("Wildcats fall to Tennessee in overtime thriller");
        assert!(title_similarity(&a, &b) < 0.5);
        assert!(quick_reject(&a, &b, THRESHOLD));
    }

    #[test]
    fn test_first_meaningful_word_skips_stop_words() {
        assert_eq!(first_meaningful_word("update the mayor of paris"), Some("mayor"));
        assert_eq!(first_meaningful_word("a b c"), None);
    }

    #[test]
    fn test_best_match_tracks_highest() {
        let recent = vec![
            ("1".to_string(), "Mayor signs budget into law".to_string()),
            ("2".to_string(), "Mayor signs budget into law today".to_string()),
        ];
        let best = best_title_match("Mayor signs budget into law today!", &recent, THRESHOLD).unwrap();
        assert_eq!(best.existing_id, "2");
        assert!((best.similarity - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_check_url_and_block_list() {
        let (store, engine) = engine();
        store.insert_if_absent(sample_record("known", "Known story")).await.unwrap();
        store.block("taken-down").unwrap();
        assert!(matches!(
            engine.check_url("known").await.unwrap(),
            DedupVerdict::Duplicate { existing_id: Some(_), .. }
        ));
        assert_eq!(engine.check_url("taken-down").await.unwrap(), DedupVerdict::Blocked);
        assert!(engine.check_url("fresh").await.unwrap().is_unique());
    }

    #[tokio::test]
    async fn test_check_title_against_store() {
        let (store, engine) = engine();
        store
            .insert_if_absent(sample_record("a", "State police investigate fatal crash on Interstate 75 near Berea"))
            .await
            .unwrap();
        let verdict = engine
            .check_title("State police investigate fatal crash on Interstate 75 near Berea | LEX18")
            .await
            .unwrap();
        assert!(matches!(verdict, DedupVerdict::Duplicate { .. }));
        assert!(engine.check_title("Berea college hosts spring concert").await.unwrap().is_unique());
    }

    #[tokio::test]
    async fn test_fingerprint_roundtrip() {
        let (_, engine) = engine();
        let body = "The county fiscal court met Monday night to discuss road repairs.";
        assert!(engine.check_fingerprint(body).await.is_unique());
        engine.remember_fingerprint(body, "42").await;
        assert_eq!(
            engine.check_fingerprint(&body.to_uppercase()).await,
            DedupVerdict::Duplicate {
                existing_id: Some("42".into()),
                reason: "content fingerprint matches a recent article".into(),
            }
        );
    }
}
