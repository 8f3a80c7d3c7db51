//! URL and text normalization primitives used by every other stage.
//!
//! The canonical URL is the deduplication key, so [`canonicalize_url`] must be
//! idempotent: feeding its output back in returns the same string.

use crate::error::{IngestError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters that only carry campaign or referral tracking.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "_ga", "_gl", "ocid",
    "cmpid", "ref", "ref_src", "smid", "taid", "outputtype", "sr_share", "cid",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Normalize an article URL.
///
/// Forces `https`, lowercases the host, drops the fragment and tracking
/// parameters, and removes any trailing slash (including the bare root path).
///
/// # Arguments
///
/// * `raw` - An absolute `http` or `https` URL
///
/// # Returns
///
/// The canonical URL string. Canonicalizing it again returns it unchanged.
///
/// # Errors
///
/// [`IngestError::Parse`] for unparseable URLs, other schemes, or URLs with
/// no host.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     canonicalize_url("http://Example.com/a/?utm_source=x#f").unwrap(),
///     "https://example.com/a"
/// );
/// ```
pub fn canonicalize_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(IngestError::Parse(format!(
                "unsupported url scheme {other}: {raw}"
            )));
        }
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| IngestError::Parse(format!("url has no host: {raw}")))?
        .to_ascii_lowercase();

    let mut out = format!("https://{host}");
    if let Some(port) = parsed.port() {
        if port != 80 && port != 443 {
            out.push_str(&format!(":{port}"));
        }
    }
    out.push_str(parsed.path().trim_end_matches('/'));

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !kept.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept.iter())
            .finish();
        out.push('?');
        out.push_str(&query);
    }
    Ok(out)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Deterministic unique key for a canonical URL.
///
/// # Arguments
///
/// * `canonical_url` - Output of [`canonicalize_url`]
///
/// # Returns
///
/// Lowercase hex SHA-256 of the URL bytes.
pub fn url_hash(canonical_url: &str) -> String {
    sha256_hex(canonical_url.as_bytes())
}

/// Stable hash of article text, used for summary cache keys and archival.
///
/// Surrounding whitespace is ignored.
pub fn content_hash(text: &str) -> String {
    sha256_hex(text.trim().as_bytes())
}

/// Fingerprint of an article body for catching syndicated copies.
///
/// # Arguments
///
/// * `body` - Extracted article text
/// * `words` - How many leading words to include
///
/// # Returns
///
/// Lowercase hex SHA-256 of the first `words` words, lowercased and joined
/// by single spaces, so whitespace and case differences do not matter.
pub fn content_fingerprint(body: &str, words: usize) -> String {
    let lead = body
        .split_whitespace()
        .take(words)
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    sha256_hex(lead.as_bytes())
}

static POSSESSIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)['’]s\b").unwrap());

/// Normalize a headline for similarity comparison.
///
/// Decodes entities, lowercases, strips possessives and punctuation, and
/// collapses whitespace.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_title("Governor&#39;s plan: What&rsquo;s next?"), "governor plan what next");
/// ```
pub fn normalize_title(title: &str) -> String {
    let decoded = html_escape::decode_html_entities(title).to_lowercase();
    let no_possessive = POSSESSIVE.replace_all(&decoded, "");
    no_possessive
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `href` against `base`, returning an absolute http(s) URL.
///
/// Empty, fragment-only, `javascript:` and `mailto:` links yield `None`.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Hosts compare equal when they match after stripping a leading `www.`.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    let strip = |u: &Url| {
        u.host_str()
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
    };
    strip(a).is_some() && strip(a) == strip(b)
}
