//! Utility functions for string handling, dates, and file system checks.
//!
//! - String truncation and slugification for logging and article slugs
//! - JSON error detection for handling truncated model responses
//! - Lenient date parsing for feed and page metadata
//! - HTML-to-text flattening that keeps paragraph breaks
//! - File system validation for output directories

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count indicator appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if it fits, otherwise the kept prefix followed by
/// `"…(+N bytes)"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When a model response is cut off by its token limit the JSON fails with an
/// EOF error. Callers re-ask once before falling back.
///
/// # Arguments
///
/// * `e` - The error returned by `serde_json`
///
/// # Returns
///
/// `true` if the input ended before the JSON value was complete.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a title to a URL-friendly slug.
///
/// Lowercases, drops anything that is not alphanumeric, and joins the words
/// with single hyphens.
///
/// # Arguments
///
/// * `title` - The headline to convert
///
/// # Returns
///
/// A lowercase, hyphen-separated slug with no leading, trailing or repeated
/// hyphens.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Trump-Xi 'situationship'"), "trump-xi-situationship");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split(|c: char| c == ' ' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Build the stored slug for an article.
///
/// # Arguments
///
/// * `title` - The article headline
/// * `url_hash` - Hash of the canonical URL
///
/// # Returns
///
/// The slugified title capped at 80 bytes, followed by the first 8
/// characters of `url_hash`. Two stories with the same headline get
/// different slugs. A title with no usable characters yields the hash
/// prefix alone.
pub fn article_slug(title: &str, url_hash: &str) -> String {
    let mut base = slugify_title(title);
    if base.len() > 80 {
        let mut cut = 80;
        while !base.is_char_boundary(cut) {
            cut -= 1;
        }
        base.truncate(cut);
        base = base.trim_end_matches('-').to_string();
    }
    let suffix: String = url_hash.chars().take(8).collect();
    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Parse the date formats seen in feeds, sitemaps and page metadata.
///
/// Tried in order: RFC 3339, RFC 2822 (RSS `pubDate`), offset date-times
/// with other separators, naive date-times (taken as UTC), and finally a
/// leading `YYYY-MM-DD`.
///
/// # Arguments
///
/// * `raw` - The date string as found in the document
///
/// # Returns
///
/// The instant in UTC, or `None` if no format matched.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

static BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|li|blockquote|section|article|tr|ul|ol|pre|figure)\s*>|<br\s*/?>")
        .unwrap()
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static INLINE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f\u{a0}]+").unwrap());
static PARAGRAPH_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*\n\s*").unwrap());

/// Flatten HTML to plain text where every block-level closing tag becomes a
/// paragraph break. Entities are decoded once.
///
/// # Arguments
///
/// * `html` - An HTML fragment or document
///
/// # Returns
///
/// Paragraphs separated by a blank line, with inline whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let marked = BLOCK_CLOSE.replace_all(html, "\n\n");
    let stripped = TAG.replace_all(&marked, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    let lines: Vec<String> = decoded
        .lines()
        .map(|line| INLINE_WS.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    PARAGRAPH_GAP
        .replace_all(joined.trim(), "\n\n")
        .replace("\n\n\n", "\n\n")
}

/// Collapse all whitespace runs into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and deletes a
/// scratch file.
///
/// # Arguments
///
/// * `path` - The directory path to validate
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be
/// written inside it.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "ééééé";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with('é'));
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("Hello World"), "hello-world");
        assert_eq!(slugify_title("Test-Article!"), "test-article");
        assert_eq!(slugify_title("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify_title("Special@#$Characters"), "specialcharacters");
        assert_eq!(
            slugify_title("Trump-Xi 'situationship'"),
            "trump-xi-situationship"
        );
    }

    #[test]
    fn test_article_slug_appends_hash() {
        let slug = article_slug("Flooding closes KY 80", "0123456789abcdef");
        assert_eq!(slug, "flooding-closes-ky-80-01234567");
        let long = article_slug(&"word ".repeat(40), "ffffffff00");
        assert!(long.len() <= 80 + 9);
        assert!(long.ends_with("-ffffffff"));
    }

    #[test]
    fn test_parse_date_formats() {
        let rfc3339 = parse_date("2025-05-06T14:30:00-04:00").unwrap();
        assert_eq!(rfc3339.to_rfc3339(), "2025-05-06T18:30:00+00:00");
        let rfc2822 = parse_date("Tue, 06 May 2025 14:30:00 GMT").unwrap();
        assert_eq!(rfc2822.day(), 6);
        let bare = parse_date("2025-05-06").unwrap();
        assert_eq!(bare.month(), 5);
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_html_to_text_keeps_paragraphs() {
        let html = "<div><p>First &amp; foremost.</p><p>Second   line.</p></div>";
        assert_eq!(html_to_text(html), "First & foremost.\n\nSecond line.");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }
}
