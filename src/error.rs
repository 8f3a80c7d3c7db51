//! Error taxonomy for the ingestion pipeline.
//!
//! Duplicates are not errors: they come back as an outcome with a reason.
//! Most variants never escape a single item. The pipeline remaps
//! [`IngestError::StorageConflict`] to a "duplicate" outcome, the run tally
//! counts [`IngestError::ShortContent`] as "rejected", and
//! [`IngestError::Validation`] and [`IngestError::Cache`] are swallowed after
//! falling back. Only [`IngestError::StoreUnavailable`] is fatal for a run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("content too short: {words} words (minimum {minimum})")]
    ShortContent { words: usize, minimum: usize },

    #[error("storage conflict on url hash {0}")]
    StorageConflict(String),

    #[error("article store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn network(url: &str, err: impl std::fmt::Display) -> Self {
        IngestError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::StoreUnavailable(_))
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(e: serde_json::Error) -> Self {
        IngestError::Parse(e.to_string())
    }
}

impl From<url::ParseError> for IngestError {
    fn from(e: url::ParseError) -> Self {
        IngestError::Parse(format!("invalid url: {e}"))
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_unavailable_is_fatal() {
        assert!(IngestError::StoreUnavailable("down".into()).is_fatal());
        assert!(!IngestError::network("https://a.com", "timeout").is_fatal());
        assert!(!IngestError::StorageConflict("abc".into()).is_fatal());
    }

    #[test]
    fn test_short_content_message() {
        let e = IngestError::ShortContent {
            words: 12,
            minimum: 60,
        };
        assert_eq!(e.to_string(), "content too short: 12 words (minimum 60)");
    }
}
