//! Summary cache keyed by source content hash.
//!
//! Two keys per summary: the summary itself (long TTL) and a freshness
//! marker whose TTL depends on the article's age. A summary whose marker has
//! expired is returned as [`CachedSummary::Stale`] and must be re-validated
//! before reuse. All cache failures count as a miss.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::KvCache;

const HOUR: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub enum CachedSummary {
    Fresh(String),
    Stale(String),
}

/// Marker TTL: 1 h for articles under a day old, 6 h under a week, 24 h
/// otherwise.
pub fn freshness_ttl(published_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let age = now.signed_duration_since(published_at);
    let hours = if age < chrono::Duration::hours(24) {
        1
    } else if age < chrono::Duration::days(7) {
        6
    } else {
        24
    };
    Duration::from_secs(hours * HOUR)
}

pub struct SummaryCache {
    cache: Arc<dyn KvCache>,
    ttl: Duration,
}

impl SummaryCache {
    pub fn new(cache: Arc<dyn KvCache>, ttl_days: u64) -> Self {
        Self {
            cache,
            ttl: Duration::from_secs(ttl_days * 24 * HOUR),
        }
    }

    fn summary_key(hash: &str) -> String {
        format!("summary:{hash}")
    }

    fn marker_key(hash: &str) -> String {
        format!("summary:fresh:{hash}")
    }

    pub async fn lookup(&self, hash: &str) -> Option<CachedSummary> {
        let summary = match self.cache.get(&Self::summary_key(hash)).await {
            Ok(Some(s)) => s,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Summary cache read failed");
                return None;
            }
        };
        match self.cache.get(&Self::marker_key(hash)).await {
            Ok(Some(_)) => Some(CachedSummary::Fresh(summary)),
            Ok(None) => Some(CachedSummary::Stale(summary)),
            Err(e) => {
                warn!(error = %e, "Freshness marker read failed");
                Some(CachedSummary::Stale(summary))
            }
        }
    }

    pub async fn store(&self, hash: &str, summary: &str, published_at: DateTime<Utc>) {
        if let Err(e) = self.cache.set(&Self::summary_key(hash), summary, self.ttl).await {
            warn!(error = %e, "Summary cache write failed");
            return;
        }
        self.refresh(hash, published_at).await;
    }

    /// Re-arm the freshness marker after a stale summary re-validated.
    pub async fn refresh(&self, hash: &str, published_at: DateTime<Utc>) {
        let ttl = freshness_ttl(published_at, Utc::now());
        match self.cache.set(&Self::marker_key(hash), "1", ttl).await {
            Ok(()) => debug!(ttl_secs = ttl.as_secs(), "Summary marked fresh"),
            Err(e) => warn!(error = %e, "Freshness marker write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCache;

    #[test]
    fn test_freshness_tiers() {
        let now = Utc::now();
        assert_eq!(freshness_ttl(now - chrono::Duration::hours(2), now), Duration::from_secs(HOUR));
        assert_eq!(freshness_ttl(now - chrono::Duration::days(3), now), Duration::from_secs(6 * HOUR));
        assert_eq!(freshness_ttl(now - chrono::Duration::days(30), now), Duration::from_secs(24 * HOUR));
        // Future-dated articles count as new.
        assert_eq!(freshness_ttl(now + chrono::Duration::hours(5), now), Duration::from_secs(HOUR));
    }

    #[tokio::test]
    async fn test_store_then_lookup_is_fresh() {
        let cache = SummaryCache::new(Arc::new(MemoryCache::new()), 30);
        assert_eq!(cache.lookup("h").await, None);
        cache.store("h", "A summary.", Utc::now()).await;
        assert_eq!(cache.lookup("h").await, Some(CachedSummary::Fresh("A summary.".into())));
    }

    #[tokio::test]
    async fn test_missing_marker_is_stale() {
        let kv = Arc::new(MemoryCache::new());
        kv.set("summary:h", "Old summary.", Duration::from_secs(60)).await.unwrap();
        let cache = SummaryCache::new(kv, 30);
        assert_eq!(cache.lookup("h").await, Some(CachedSummary::Stale("Old summary.".into())));
        cache.refresh("h", Utc::now()).await;
        assert_eq!(cache.lookup("h").await, Some(CachedSummary::Fresh("Old summary.".into())));
    }
}
