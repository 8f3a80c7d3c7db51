//! Metadata scrape: OpenGraph/Twitter tags, canonical link, author, structured
//! publication date, lead image, and a naive main-content fallback.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::canonical::resolve_link;
use crate::utils::{collapse_whitespace, parse_date};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    /// Text of `<article>`, else `<main>`, else `<body>`.
    pub text: Option<String>,
}

fn meta_content(document: &Html, keys: &[&str]) -> Option<String> {
    let selector = Selector::parse("meta[content]").unwrap();
    for key in keys {
        let found = document.select(&selector).find_map(|el| {
            let v = el.value();
            let name = v.attr("property").or_else(|| v.attr("name"))?;
            if name.eq_ignore_ascii_case(key) {
                v.attr("content").map(str::trim).filter(|c| !c.is_empty())
            } else {
                None
            }
        });
        if let Some(content) = found {
            return Some(content.to_string());
        }
    }
    None
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .find(|t| !t.is_empty())
}

fn json_ld_values(document: &Html) -> Vec<Value> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mut values = Vec::new();
    for el in document.select(&selector) {
        let raw = el.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        // Top-level arrays and `@graph` containers both hold the article object.
        let nodes = match &value {
            Value::Array(items) => items.clone(),
            _ => match value.get("@graph").and_then(Value::as_array) {
                Some(graph) => graph.clone(),
                None => vec![value.clone()],
            },
        };
        values.extend(nodes);
    }
    values
}

fn json_ld_date(nodes: &[Value]) -> Option<DateTime<Utc>> {
    ["datePublished", "dateCreated", "dateModified"]
        .iter()
        .find_map(|key| {
            nodes
                .iter()
                .find_map(|n| n.get(*key).and_then(Value::as_str).and_then(parse_date))
        })
}

fn json_ld_author(nodes: &[Value]) -> Option<String> {
    nodes.iter().find_map(|n| {
        let author = n.get("author")?;
        let first = match author {
            Value::Array(list) => list.first()?,
            other => other,
        };
        match first {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => first.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    })
}

fn structured_date(document: &Html, nodes: &[Value]) -> Option<DateTime<Utc>> {
    if let Some(date) = json_ld_date(nodes) {
        return Some(date);
    }
    let meta = meta_content(
        document,
        &[
            "article:published_time",
            "og:published_time",
            "date",
            "publish_date",
            "publish-date",
            "pubdate",
            "dc.date.issued",
            "sailthru.date",
        ],
    );
    if let Some(date) = meta.as_deref().and_then(parse_date) {
        return Some(date);
    }
    let selector = Selector::parse("time[datetime]").unwrap();
    document
        .select(&selector)
        .find_map(|el| el.value().attr("datetime").and_then(parse_date))
}

fn byline(document: &Html) -> Option<String> {
    let text = first_text(document, r#"[rel="author"], .byline, .author, [itemprop="author"]"#)?;
    let trimmed = text
        .strip_prefix("By ")
        .or_else(|| text.strip_prefix("by "))
        .unwrap_or(&text)
        .trim()
        .to_string();
    // Bylines longer than a few names are usually a whole author bio box.
    (!trimmed.is_empty() && trimmed.split_whitespace().count() <= 8).then_some(trimmed)
}

fn main_content_text(document: &Html) -> Option<String> {
    let paragraph = Selector::parse("p").unwrap();
    for tag in ["article", "main", "body"] {
        let selector = Selector::parse(tag).unwrap();
        let Some(container) = document.select(&selector).next() else {
            continue;
        };
        let paragraphs: Vec<String> = container
            .select(&paragraph)
            .map(|p| collapse_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
            .collect();
        let text = if paragraphs.is_empty() {
            collapse_whitespace(&visible_text(container))
        } else {
            paragraphs.join("\n\n")
        };
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}

fn visible_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Scrape page metadata. Relative canonical and image URLs are resolved
/// against `page_url`.
pub fn scrape_metadata(html: &str, page_url: &Url) -> PageMetadata {
    let document = Html::parse_document(html);
    let nodes = json_ld_values(&document);

    let title = meta_content(&document, &["og:title", "twitter:title"])
        .or_else(|| first_text(&document, "title"))
        .or_else(|| first_text(&document, "h1"));

    let canonical_selector = Selector::parse(r#"link[rel="canonical"][href]"#).unwrap();
    let canonical_url = document
        .select(&canonical_selector)
        .filter_map(|el| el.value().attr("href"))
        .chain(meta_content(&document, &["og:url"]).as_deref())
        .find_map(|href| resolve_link(page_url, href))
        .map(|u| u.to_string());

    let author = meta_content(&document, &["author", "article:author", "parsely-author"])
        .filter(|a| !a.starts_with("http"))
        .or_else(|| json_ld_author(&nodes))
        .or_else(|| byline(&document));

    let image_url = meta_content(&document, &["og:image", "og:image:url", "twitter:image"])
        .and_then(|src| resolve_link(page_url, &src))
        .map(|u| u.to_string());

    PageMetadata {
        title,
        description: meta_content(&document, &["og:description", "twitter:description", "description"]),
        canonical_url,
        author,
        published_at: structured_date(&document, &nodes),
        image_url,
        text: main_content_text(&document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page() -> Url {
        Url::parse("https://www.example.com/news/story?utm_source=x").unwrap()
    }

    #[test]
    fn test_opengraph_and_canonical() {
        let html = r#"<html><head>
            <title>Fallback &amp; title</title>
            <meta property="og:title" content="Bridge reopens &amp; traffic resumes">
            <meta property="og:image" content="/img/bridge.jpg">
            <meta name="author" content="Jane Reporter">
            <link rel="canonical" href="/news/story">
        </head><body><article><p>First paragraph.</p><p>Second paragraph.</p></article></body></html>"#;
        let meta = scrape_metadata(html, &page());
        assert_eq!(meta.title.as_deref(), Some("Bridge reopens & traffic resumes"));
        assert_eq!(meta.canonical_url.as_deref(), Some("https://www.example.com/news/story"));
        assert_eq!(meta.image_url.as_deref(), Some("https://www.example.com/img/bridge.jpg"));
        assert_eq!(meta.author.as_deref(), Some("Jane Reporter"));
        assert_eq!(meta.text.as_deref(), Some("First paragraph.\n\nSecond paragraph."));
    }

    #[test]
    fn test_json_ld_date_and_author() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@graph": [{"@type": "WebPage"}, {"@type": "NewsArticle",
              "datePublished": "2025-05-06T14:30:00-04:00",
              "author": [{"@type": "Person", "name": "Sam Writer"}]}]}
        </script></head><body><main>Only text</main></body></html>"#;
        let meta = scrape_metadata(html, &page());
        assert_eq!(
            meta.published_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 18, 30, 0).unwrap())
        );
        assert_eq!(meta.author.as_deref(), Some("Sam Writer"));
        assert_eq!(meta.text.as_deref(), Some("Only text"));
    }

    #[test]
    fn test_meta_and_time_dates() {
        let html = r#"<meta property="article:published_time" content="2025-05-01T08:00:00Z">"#;
        assert_eq!(
            scrape_metadata(html, &page()).published_at,
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap())
        );
        let html = r#"<body><time datetime="2025-04-30">April 30</time></body>"#;
        assert_eq!(
            scrape_metadata(html, &page()).published_at,
            Some(Utc.with_ymd_and_hms(2025, 4, 30, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_byline_fallback() {
        let html = r#"<body><span class="byline">By Alex Smith</span><p>Text</p></body>"#;
        assert_eq!(scrape_metadata(html, &page()).author.as_deref(), Some("Alex Smith"));
    }

    #[test]
    fn test_no_metadata() {
        let meta = scrape_metadata("<html><body></body></html>", &page());
        assert!(meta.title.is_none());
        assert!(meta.published_at.is_none());
        assert!(meta.text.is_none());
    }
}
