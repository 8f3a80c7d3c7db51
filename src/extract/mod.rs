//! Article extraction: turns a candidate link into clean title, author, date
//! and body.
//!
//! HTML pages go through two independent extractions, a metadata scrape
//! ([`metadata`]) and a readability pass ([`readability`]), merged field by
//! field with fixed preference orders. Non-HTML responses (lightweight or
//! social-post sources) fall back to the feed description.

pub mod metadata;
pub mod readability;

use chrono::Utc;
use tracing::{debug, instrument};
use url::Url;

use crate::canonical::canonicalize_url;
use crate::error::Result;
use crate::fetch::{FetchedPage, Fetcher};
use crate::models::{ExtractedArticle, FeedItem};
use crate::scrapers::feed::title_from_url;
use crate::utils::{collapse_whitespace, html_to_text};
use metadata::scrape_metadata;
use readability::extract_readable;

/// Upper bound on the text handed to the classifier.
pub const LEAD_MAX_CHARS: usize = 4000;

/// Cut `text` to at most `max` chars, backing off to a word boundary.
pub fn cap_lead(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn paragraphs_to_html(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>\n", html_escape::encode_text(p)))
        .collect()
}

/// Prefer the page's declared canonical link, unless it points back at the
/// site root (a common CMS misconfiguration).
fn choose_canonical(declared: Option<&str>, fetched: &str, link: &str) -> Result<String> {
    let declared = declared
        .and_then(|d| Url::parse(d).ok())
        .filter(|u| !u.path().trim_matches('/').is_empty());
    match declared {
        Some(url) => canonicalize_url(url.as_str()),
        None if !fetched.is_empty() => canonicalize_url(fetched),
        None => canonicalize_url(link),
    }
}

/// Merge the extractions of an already-fetched page.
pub fn extract_from_page(page: &FetchedPage, item: &FeedItem) -> Result<ExtractedArticle> {
    let feed_description = non_empty(item.description.as_deref());
    let feed_title = non_empty(Some(item.title.as_str()));

    if !page.is_html() {
        let body = feed_description
            .map(str::to_string)
            .unwrap_or_else(|| html_to_text(&page.body));
        let title = feed_title
            .map(collapse_whitespace)
            .unwrap_or_else(|| title_from_url(&item.link));
        return Ok(ExtractedArticle {
            canonical_url: choose_canonical(None, &page.url, &item.link)?,
            source_url: item.link.clone(),
            title,
            author: None,
            published_at: item.published_at.unwrap_or_else(Utc::now),
            content_html: paragraphs_to_html(&body),
            classification_lead: cap_lead(&body, LEAD_MAX_CHARS),
            content_text: body,
            image_url: None,
        });
    }

    let page_url = Url::parse(&page.url).or_else(|_| Url::parse(&item.link))?;
    let meta = scrape_metadata(&page.body, &page_url);
    let readable = extract_readable(&page.body);

    let title = readable
        .as_ref()
        .and_then(|r| non_empty(r.title.as_deref()))
        .or(non_empty(meta.title.as_deref()))
        .or(feed_title)
        .map(collapse_whitespace)
        .unwrap_or_else(|| title_from_url(&item.link));

    let readable_paragraphs = readable
        .as_ref()
        .map(|r| html_to_text(&r.html))
        .filter(|t| !t.trim().is_empty());
    let content_text = readable_paragraphs
        .or_else(|| readable.as_ref().map(|r| r.text.clone()))
        .or_else(|| meta.text.clone())
        .or_else(|| feed_description.map(str::to_string))
        .unwrap_or_default();

    // The lead is always plain text, never markup.
    let lead_source = readable
        .as_ref()
        .map(|r| r.text.as_str())
        .or(non_empty(meta.text.as_deref()))
        .or(feed_description)
        .unwrap_or_default();

    let content_html = match &readable {
        Some(r) => r.html.clone(),
        None => paragraphs_to_html(&content_text),
    };

    let article = ExtractedArticle {
        canonical_url: choose_canonical(meta.canonical_url.as_deref(), &page.url, &item.link)?,
        source_url: item.link.clone(),
        title,
        author: meta.author.clone(),
        published_at: meta.published_at.or(item.published_at).unwrap_or_else(Utc::now),
        content_html,
        classification_lead: cap_lead(lead_source, LEAD_MAX_CHARS),
        content_text,
        image_url: meta.image_url.clone(),
    };
    debug!(
        url = %article.canonical_url,
        readability = readable.is_some(),
        chars = article.content_text.len(),
        "Extracted article"
    );
    Ok(article)
}

/// Fetch and extract one feed item.
#[instrument(level = "info", skip_all, fields(url = %item.link))]
pub async fn extract_article(fetcher: &dyn Fetcher, item: &FeedItem) -> Result<ExtractedArticle> {
    let page = fetcher.fetch(&item.link).await?;
    extract_from_page(&page, item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(link: &str) -> FeedItem {
        FeedItem {
            title: "Feed title for story".into(),
            link: link.into(),
            published_at: Some(Utc.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap()),
            description: Some("Feed description text.".into()),
        }
    }

    fn html_page(url: &str, body: &str) -> FetchedPage {
        FetchedPage {
            url: url.into(),
            status: 200,
            content_type: Some("text/html".into()),
            body: body.into(),
        }
    }

    const ARTICLE: &str = r#"<html><head>
        <title>Flood warning issued for Pike County | WYMT</title>
        <meta property="og:title" content="OG flood title">
        <meta property="article:published_time" content="2025-05-06T14:00:00Z">
        <link rel="canonical" href="https://www.WYMT.com/2025/05/06/flood-warning/?utm_source=fb">
        </head><body><article>
        <h1>Flood warning issued for Pike County</h1>
        <p>The National Weather Service issued a flood warning for Pike County on Tuesday, citing heavy rain.</p>
        <p>Officials said creeks could rise quickly overnight, and residents should avoid low roads.</p>
        </article></body></html>"#;

    #[test]
    fn test_html_merge_prefers_readability() {
        let page = html_page("https://www.wymt.com/2025/05/06/flood-warning/", ARTICLE);
        let article = extract_from_page(&page, &item("https://www.wymt.com/2025/05/06/flood-warning/")).unwrap();
        assert_eq!(article.title, "Flood warning issued for Pike County");
        assert_eq!(article.canonical_url, "https://www.wymt.com/2025/05/06/flood-warning");
        assert_eq!(article.published_at, Utc.with_ymd_and_hms(2025, 5, 6, 14, 0, 0).unwrap());
        assert!(article.content_text.contains("\n\nOfficials said"));
        assert!(!article.classification_lead.contains('<'));
        assert!(article.content_html.starts_with("<p>"));
    }

    #[test]
    fn test_non_html_uses_feed_description() {
        let page = FetchedPage {
            url: "https://social.example/post/1".into(),
            status: 200,
            content_type: Some("application/json".into()),
            body: "{\"id\": 1}".into(),
        };
        let article = extract_from_page(&page, &item("https://social.example/post/1")).unwrap();
        assert_eq!(article.content_text, "Feed description text.");
        assert_eq!(article.classification_lead, "Feed description text.");
        assert_eq!(article.title, "Feed title for story");
        assert_eq!(article.published_at, Utc.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_thin_page_falls_back_to_scrape_and_feed() {
        let page = html_page("https://e.com/news/a", "<html><body><p>Tiny.</p></body></html>");
        let mut feed_item = item("https://e.com/news/a");
        feed_item.published_at = None;
        let article = extract_from_page(&page, &feed_item).unwrap();
        assert_eq!(article.title, "Feed title for story");
        assert_eq!(article.content_text, "Tiny.");
        assert!(article.published_at <= Utc::now());
    }

    #[test]
    fn test_root_canonical_is_ignored() {
        let html = r#"<link rel="canonical" href="https://e.com/"><p>Body</p>"#;
        let page = html_page("https://e.com/news/story?fbclid=abc", html);
        let article = extract_from_page(&page, &item("https://e.com/news/story")).unwrap();
        assert_eq!(article.canonical_url, "https://e.com/news/story");
    }

    #[test]
    fn test_cap_lead_word_boundary() {
        assert_eq!(cap_lead("alpha beta gamma", 12), "alpha beta");
        assert_eq!(cap_lead("short", 12), "short");
        let long = "word ".repeat(2000);
        assert!(cap_lead(&long, LEAD_MAX_CHARS).chars().count() <= LEAD_MAX_CHARS);
    }
}
