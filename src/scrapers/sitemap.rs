//! Bounded sitemap-index traversal.
//!
//! An explicit worklist with a visited set, a depth cap and a per-index child
//! cap guarantees termination on cyclic or enormous sitemap trees.

use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};
use url::Url;

use super::feed::{ParsedFeed, parse_feed};
use crate::fetch::Fetcher;
use crate::models::FeedItem;

/// Levels below the root index that are still followed.
pub const MAX_SITEMAP_DEPTH: usize = 2;
/// Children followed per sitemap index.
pub const MAX_SITEMAP_CHILDREN: usize = 5;
/// Items aggregated across the whole traversal.
pub const MAX_SITEMAP_ITEMS: usize = 500;

/// Expand the children of a sitemap index into feed items.
///
/// `root` is the index itself and is marked visited up front so a child that
/// links back to it is ignored. Fetch and parse failures skip that child.
pub async fn expand_sitemap_index(
    fetcher: &dyn Fetcher,
    root: &str,
    children: Vec<String>,
) -> Vec<FeedItem> {
    let mut visited: HashSet<String> = HashSet::from([root.to_string()]);
    let mut queue: VecDeque<(String, usize)> = children
        .into_iter()
        .take(MAX_SITEMAP_CHILDREN)
        .map(|c| (c, 1))
        .collect();
    let mut items = Vec::new();

    while let Some((url, depth)) = queue.pop_front() {
        if items.len() >= MAX_SITEMAP_ITEMS {
            break;
        }
        if depth > MAX_SITEMAP_DEPTH || !visited.insert(url.clone()) {
            continue;
        }
        let Ok(base) = Url::parse(&url) else {
            continue;
        };
        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(%url, error = %e, "Sitemap child fetch failed; skipping");
                continue;
            }
        };
        match parse_feed(&page.body, &base) {
            Ok(ParsedFeed::Items(found)) => {
                debug!(%url, depth, count = found.len(), "Sitemap child parsed");
                items.extend(found);
            }
            Ok(ParsedFeed::SitemapIndex(grandchildren)) => {
                queue.extend(
                    grandchildren
                        .into_iter()
                        .take(MAX_SITEMAP_CHILDREN)
                        .map(|c| (c, depth + 1)),
                );
            }
            Err(e) => warn!(%url, error = %e, "Sitemap child unparseable; skipping"),
        }
    }

    items.truncate(MAX_SITEMAP_ITEMS);
    items
}
