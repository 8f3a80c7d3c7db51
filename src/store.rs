//! Downstream collaborator contracts: article store, key-value cache, and
//! blob archive.
//!
//! The pipeline only talks to these traits, so the core runs against the
//! in-memory implementations in tests and in the CLI, and against real
//! backends when embedded in a service.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::ArticleRecord;

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    Inserted { id: String },
    /// Another writer already owns this url hash.
    Conflict { existing_id: String },
}

/// Relational store for article records keyed by unique url hash.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Id of the record with this url hash, if one exists.
    async fn find_by_hash(&self, url_hash: &str) -> Result<Option<String>>;

    /// Whether an admin has blocked this url hash (takedowns).
    async fn is_blocked(&self, url_hash: &str) -> Result<bool>;

    /// `(id, title)` of the most recently ingested records, newest first.
    async fn recent_titles(&self, limit: usize) -> Result<Vec<(String, String)>>;

    /// Insert unless a record with the same url hash exists. Must be atomic
    /// with respect to concurrent callers.
    async fn insert_if_absent(&self, record: ArticleRecord) -> Result<InsertResult>;
}

/// Generic key-value cache with explicit time-to-live per entry.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Best-effort archival of raw ingestion payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}

fn poisoned<T>(_: T) -> IngestError {
    IngestError::StoreUnavailable("in-memory store lock poisoned".to_string())
}

#[derive(Default)]
struct ArticleTable {
    by_hash: HashMap<String, ArticleRecord>,
    /// Insertion order of url hashes, oldest first.
    order: Vec<String>,
    blocked: HashSet<String>,
}

/// In-memory [`ArticleStore`]. A single mutex makes insert-if-absent atomic.
#[derive(Default)]
pub struct MemoryArticleStore {
    table: Mutex<ArticleTable>,
    next_id: AtomicU64,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, url_hash: &str) -> Result<()> {
        let mut table = self.table.lock().map_err(poisoned)?;
        table.blocked.insert(url_hash.to_string());
        Ok(())
    }

    /// All records in insertion order.
    pub fn records(&self) -> Result<Vec<ArticleRecord>> {
        let table = self.table.lock().map_err(poisoned)?;
        Ok(table
            .order
            .iter()
            .filter_map(|h| table.by_hash.get(h).cloned())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn find_by_hash(&self, url_hash: &str) -> Result<Option<String>> {
        let table = self.table.lock().map_err(poisoned)?;
        Ok(table.by_hash.get(url_hash).map(|r| r.id.clone()))
    }

    async fn is_blocked(&self, url_hash: &str) -> Result<bool> {
        let table = self.table.lock().map_err(poisoned)?;
        Ok(table.blocked.contains(url_hash))
    }

    async fn recent_titles(&self, limit: usize) -> Result<Vec<(String, String)>> {
        let table = self.table.lock().map_err(poisoned)?;
        Ok(table
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|h| table.by_hash.get(h))
            .map(|r| (r.id.clone(), r.article.title.clone()))
            .collect())
    }

    async fn insert_if_absent(&self, mut record: ArticleRecord) -> Result<InsertResult> {
        let mut table = self.table.lock().map_err(poisoned)?;
        if let Some(existing) = table.by_hash.get(&record.url_hash) {
            return Ok(InsertResult::Conflict {
                existing_id: existing.id.clone(),
            });
        }
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        record.id = id.clone();
        table.order.push(record.url_hash.clone());
        table.by_hash.insert(record.url_hash.clone(), record);
        Ok(InsertResult::Inserted { id })
    }
}

/// In-memory [`KvCache`] with lazy expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| IngestError::Cache("cache lock poisoned".into()))?;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| IngestError::Cache("cache lock poisoned".into()))?;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

/// Writes blobs under a root directory, one file per key.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.root.join(key.trim_start_matches('/'));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), "Archived ingestion payload");
        Ok(())
    }
}

/// Discards everything; used when archival is not configured.
pub struct NullBlobStore;

#[async_trait]
impl BlobStore for NullBlobStore {
    async fn put(&self, _key: &str, _bytes: Vec<u8>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_record;

    #[tokio::test]
    async fn test_insert_if_absent_conflicts_on_same_hash() {
        let store = MemoryArticleStore::new();
        let first = store.insert_if_absent(sample_record("abc", "Title")).await.unwrap();
        let second = store.insert_if_absent(sample_record("abc", "Other")).await.unwrap();
        let InsertResult::Inserted { id } = first else {
            panic!("first insert should succeed");
        };
        assert_eq!(second, InsertResult::Conflict { existing_id: id.clone() });
        assert_eq!(store.find_by_hash("abc").await.unwrap(), Some(id));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_titles_newest_first() {
        let store = MemoryArticleStore::new();
        for (hash, title) in [("a", "One"), ("b", "Two"), ("c", "Three")] {
            store.insert_if_absent(sample_record(hash, title)).await.unwrap();
        }
        let recent = store.recent_titles(2).await.unwrap();
        let titles: Vec<&str> = recent.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(titles, vec!["Three", "Two"]);
    }

    #[tokio::test]
    async fn test_block_list() {
        let store = MemoryArticleStore::new();
        store.block("dead").unwrap();
        assert!(store.is_blocked("dead").await.unwrap());
        assert!(!store.is_blocked("alive").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_cache_expires() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        cache.set("gone", "v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("gone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fs_blob_store_writes_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        blobs
            .put("ingest/2025-05-06/abc.json", b"{}".to_vec())
            .await
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("ingest/2025-05-06/abc.json")).unwrap();
        assert_eq!(written, "{}");
    }
}
