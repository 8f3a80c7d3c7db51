//! Fallback discovery for sources without a usable feed.
//!
//! Article links are scraped from the homepage the same way a hand-written
//! per-site indexer would (select anchors, resolve against the page URL), but
//! with a generic "does this path look like an article" test instead of a
//! site-specific selector. A few publishers' search-result pages get a
//! dedicated path rule instead.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::feed::title_from_url;
use super::robots::RobotsGate;
use crate::canonical::{resolve_link, same_origin};
use crate::fetch::{FetchedPage, Fetcher};
use crate::models::FeedItem;
use crate::utils::collapse_whitespace;

/// Links collected before discovery stops.
pub const LINK_BUDGET: usize = 30;
/// Below this many homepage links, section pages are followed.
pub const MIN_HOMEPAGE_LINKS: usize = 8;
/// Section pages followed one level deeper.
pub const MAX_SECTION_PAGES: usize = 3;

const ARTICLE_SEGMENTS: &[&str] = &[
    "news", "local", "sports", "weather", "schools", "education", "obituary", "obituaries",
    "story", "stories", "article", "articles",
];

const EXCLUDED_SEGMENTS: &[&str] = &[
    "tag", "tags", "category", "categories", "feed", "rss", "video", "videos", "author",
    "authors", "search", "login", "subscribe", "newsletter", "newsletters", "contact", "about",
    "privacy", "terms", "advertise", "page", "wp-admin", "wp-login.php",
];

const NON_HTML_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".pdf", ".mp3", ".mp4", ".mov", ".zip",
    ".xml", ".rss", ".json", ".css", ".js", ".ics",
];

static DATE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(19|20)\d{2}/(0?[1-9]|1[0-2])/").unwrap());

/// A publisher whose search-result pages need a dedicated link rule.
pub struct PublisherRule {
    pub host_suffix: &'static str,
    /// Path prefix identifying the search-result page.
    pub page_prefix: &'static str,
    /// Article links on that page match this path pattern.
    pub link_pattern: &'static str,
}

pub const PUBLISHER_RULES: &[PublisherRule] = &[
    PublisherRule {
        host_suffix: "kentucky.com",
        page_prefix: "/search",
        link_pattern: r"^/news/[a-z0-9/-]+/article\d+\.html$",
    },
    PublisherRule {
        host_suffix: "courier-journal.com",
        page_prefix: "/search",
        link_pattern: r"^/story/[a-z0-9-]+(/[a-z0-9-]+)*/\d{4}/\d{2}/\d{2}/[a-z0-9-]+/\d+/?$",
    },
    PublisherRule {
        host_suffix: "wymt.com",
        page_prefix: "/search",
        link_pattern: r"^/\d{4}/\d{2}/\d{2}/[a-z0-9-]+/?$",
    },
];

pub fn publisher_rule(url: &Url) -> Option<&'static PublisherRule> {
    let host = url.host_str()?.to_ascii_lowercase();
    PUBLISHER_RULES
        .iter()
        .find(|r| host.ends_with(r.host_suffix) && url.path().starts_with(r.page_prefix))
}

/// Whether a same-origin path looks like an individual article.
pub fn is_article_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if NON_HTML_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }
    let segments: Vec<&str> = lower.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| EXCLUDED_SEGMENTS.contains(s)) {
        return false;
    }
    // A bare section index ("/news") is not an article.
    if segments.len() < 2 {
        return false;
    }
    DATE_SEGMENT.is_match(&lower) || segments.iter().any(|s| ARTICLE_SEGMENTS.contains(s))
}

fn anchors(base: &Url, html: &str) -> Vec<(Url, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();
    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let resolved = resolve_link(base, href)?;
            let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            Some((resolved, text))
        })
        .collect()
}

fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Article-shaped links on a page, in document order, without duplicates.
pub fn extract_article_links(base: &Url, html: &str, rule: Option<&PublisherRule>) -> Vec<FeedItem> {
    let rule_re = rule.and_then(|r| Regex::new(r.link_pattern).ok());
    let mut seen = HashSet::new();
    anchors(base, html)
        .into_iter()
        .filter(|(url, _)| same_origin(base, url))
        .filter(|(url, _)| match &rule_re {
            Some(re) => re.is_match(url.path()),
            None => is_article_path(url.path()),
        })
        .map(|(url, text)| (strip_fragment(url), text))
        .filter(|(url, _)| seen.insert(url.to_string()))
        .map(|(url, text)| {
            let link = url.to_string();
            // Short anchor text is usually "Read more" or a kicker, not a headline.
            let title = if text.split_whitespace().count() >= 3 {
                text
            } else {
                title_from_url(&link)
            };
            FeedItem {
                title,
                link,
                published_at: None,
                description: None,
            }
        })
        .collect()
}

/// Same-origin section index pages (`/news`, `/sports/`), candidates for one
/// more level of discovery.
pub fn extract_section_links(base: &Url, html: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    anchors(base, html)
        .into_iter()
        .map(|(url, _)| strip_fragment(url))
        .filter(|url| same_origin(base, url) && url.query().is_none())
        .filter(|url| {
            let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
            segments.len() == 1
                && ARTICLE_SEGMENTS.contains(&segments[0].to_ascii_lowercase().as_str())
        })
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// Discover article links from an already-fetched homepage.
///
/// Generic crawling honours robots.txt for the homepage, every section page
/// and every discovered link. A publisher search page uses its dedicated rule
/// and is not crawled any deeper.
#[instrument(level = "info", skip_all, fields(url = %homepage.url))]
pub async fn discover_links(
    fetcher: &dyn Fetcher,
    robots: &RobotsGate,
    homepage: &FetchedPage,
) -> Vec<FeedItem> {
    let Ok(base) = Url::parse(&homepage.url) else {
        return Vec::new();
    };

    if let Some(rule) = publisher_rule(&base) {
        let items = extract_article_links(&base, &homepage.body, Some(rule));
        info!(count = items.len(), publisher = rule.host_suffix, "Publisher search rule applied");
        return items.into_iter().take(LINK_BUDGET).collect();
    }

    if !robots.allowed(&base).await {
        warn!("robots.txt disallows homepage crawl; skipping fallback discovery");
        return Vec::new();
    }

    let mut items = extract_article_links(&base, &homepage.body, None);
    if items.len() < MIN_HOMEPAGE_LINKS {
        for section in extract_section_links(&base, &homepage.body)
            .into_iter()
            .take(MAX_SECTION_PAGES)
        {
            if items.len() >= LINK_BUDGET {
                break;
            }
            if !robots.allowed(&section).await {
                debug!(section = %section, "robots.txt disallows section page");
                continue;
            }
            match fetcher.fetch(section.as_str()).await {
                Ok(page) if page.is_html() => {
                    let found = extract_article_links(&section, &page.body, None);
                    debug!(section = %section, count = found.len(), "Section page scanned");
                    items.extend(found);
                }
                Ok(_) => {}
                Err(e) => warn!(section = %section, error = %e, "Section page fetch failed; skipping"),
            }
        }
    }

    let mut seen = HashSet::new();
    items.retain(|i| seen.insert(i.link.clone()));

    let mut allowed = Vec::new();
    for item in items {
        if allowed.len() >= LINK_BUDGET {
            break;
        }
        let Ok(url) = Url::parse(&item.link) else {
            continue;
        };
        if robots.allowed(&url).await {
            allowed.push(item);
        }
    }
    info!(count = allowed.len(), "Fallback discovery finished");
    allowed
}
