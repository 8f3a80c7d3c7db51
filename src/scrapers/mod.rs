//! Feed resolution and fallback discovery.
//!
//! Turns a [`Source`] root URL into candidate [`FeedItem`]s in two phases:
//!
//! 1. **Feeds**: advertised `<link rel="alternate">` feeds, then conventional
//!    suffixes (`/feed`, `/rss`, ...), parsed as RSS, Atom, sitemap urlset or
//!    sitemap index. The first candidate yielding at least one item wins.
//! 2. **Fallback**: article-shaped links scraped from the homepage, gated by
//!    robots.txt.
//!
//! | Module | Concern |
//! |--------|---------|
//! | [`feed`] | RSS/Atom/sitemap parsing and candidate URLs |
//! | [`sitemap`] | bounded sitemap-index traversal |
//! | [`fallback`] | homepage link discovery and publisher search rules |
//! | [`robots`] | cached robots.txt gate |
//!
//! A single feed or page failure never fails the source; only an unreachable
//! source (homepage and every candidate failed) is reported as an error.

pub mod fallback;
pub mod feed;
pub mod robots;
pub mod sitemap;

use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{IngestError, Result};
use crate::fetch::Fetcher;
use crate::models::{FeedItem, Source};
use feed::{ParsedFeed, candidate_urls, parse_feed};
use robots::RobotsGate;

/// Parse a fetched candidate into items, expanding sitemap indexes.
async fn items_from_document(fetcher: &dyn Fetcher, url: &str, body: &str) -> Result<Vec<FeedItem>> {
    let base = Url::parse(url)?;
    match parse_feed(body, &base)? {
        ParsedFeed::Items(items) => Ok(items),
        ParsedFeed::SitemapIndex(children) => {
            debug!(%url, children = children.len(), "Expanding sitemap index");
            Ok(sitemap::expand_sitemap_index(fetcher, url, children).await)
        }
    }
}

fn dedupe_by_link(mut items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen = HashSet::new();
    items.retain(|i| !i.link.is_empty() && seen.insert(i.link.clone()));
    items
}

/// Discover candidate items for one source.
#[instrument(level = "info", skip_all, fields(source = %source.label()))]
pub async fn discover_items(
    fetcher: &dyn Fetcher,
    robots: &RobotsGate,
    source: &Source,
) -> Result<Vec<FeedItem>> {
    let root = Url::parse(&source.url)?;

    let homepage = match fetcher.fetch(root.as_str()).await {
        Ok(page) => Some(page),
        Err(e) => {
            warn!(error = %e, "Homepage fetch failed; trying feed suffixes only");
            None
        }
    };

    // A source configured directly as a feed URL.
    if let Some(page) = homepage.as_ref().filter(|p| !p.is_html()) {
        match items_from_document(fetcher, &page.url, &page.body).await {
            Ok(items) if !items.is_empty() => {
                info!(count = items.len(), "Source URL is itself a feed");
                return Ok(dedupe_by_link(items));
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Source URL is not a parseable feed"),
        }
    }

    let html = homepage.as_ref().filter(|p| p.is_html()).map(|p| p.body.as_str());
    let mut any_reachable = homepage.is_some();
    for candidate in candidate_urls(&root, html) {
        let page = match fetcher.fetch(&candidate).await {
            Ok(page) => page,
            Err(e) => {
                debug!(%candidate, error = %e, "Feed candidate unavailable");
                continue;
            }
        };
        any_reachable = true;
        match items_from_document(fetcher, &candidate, &page.body).await {
            Ok(items) if !items.is_empty() => {
                info!(%candidate, count = items.len(), "Resolved feed");
                return Ok(dedupe_by_link(items));
            }
            Ok(_) => debug!(%candidate, "Feed candidate had no items"),
            Err(e) => debug!(%candidate, error = %e, "Feed candidate unparseable"),
        }
    }

    if !any_reachable {
        return Err(IngestError::Network {
            url: source.url.clone(),
            message: "homepage and every feed candidate failed".into(),
        });
    }

    let Some(page) = homepage.filter(|p| p.is_html()) else {
        warn!("No feed found and no html homepage to fall back on");
        return Ok(Vec::new());
    };
    let items = fallback::discover_links(fetcher, robots, &page).await;
    Ok(dedupe_by_link(items))
}
