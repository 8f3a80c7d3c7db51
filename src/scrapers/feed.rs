//! RSS, Atom and sitemap parsing plus feed candidate discovery.
//!
//! All XML goes through one lenient `quick-xml` walker ([`collect_records`])
//! that gathers the child text of every `<item>`, `<entry>`, `<url>` or
//! `<sitemap>` element. Publisher feeds are frequently malformed, so a parse
//! error after at least one complete record keeps what was read.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

use crate::canonical::resolve_link;
use crate::error::{IngestError, Result};
use crate::models::FeedItem;
use crate::utils::{collapse_whitespace, html_to_text, parse_date};

/// Conventional feed locations tried on every source root.
pub const FEED_SUFFIXES: &[&str] = &["/feed", "/rss", "/rss.xml", "/feed.xml", "/index.xml"];

/// What a fetched candidate turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFeed {
    Items(Vec<FeedItem>),
    /// Child sitemap URLs, most recently modified first.
    SitemapIndex(Vec<String>),
}

#[derive(Debug, Default)]
struct Record {
    fields: HashMap<String, String>,
    /// `(rel, href)` from `<link href=..>` attributes (Atom style).
    links: Vec<(Option<String>, String)>,
}

impl Record {
    fn field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|n| self.fields.get(*n))
            .map(|s| s.as_str())
            .find(|s| !s.is_empty())
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

fn link_attrs(e: &BytesStart<'_>) -> Option<(Option<String>, String)> {
    let mut rel = None;
    let mut href = None;
    for attr in e.attributes().with_checks(false).flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(html_escape::decode_html_entities(&value).to_string()),
            b"rel" => rel = Some(value.to_ascii_lowercase()),
            _ => {}
        }
    }
    href.map(|h| (rel, h))
}

/// Name of the document's root element, lowercased, without namespace prefix.
pub fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => return Some(local_name(&e)),
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Collect every `<record>` element with the text of its descendants keyed by
/// local name. The first non-empty value wins for repeated names.
fn collect_records(xml: &str, record: &str) -> Result<Vec<Record>> {
    // Text is trimmed per field, not per event: entity references split text
    // into several events and the spaces around them are significant.
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;

    let mut out = Vec::new();
    let mut current: Option<Record> = None;
    let mut field: Option<String> = None;
    let mut buf = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) if out.is_empty() => {
                return Err(IngestError::Parse(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            Err(_) => break,
        };
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == record && current.is_none() {
                    current = Some(Record::default());
                    field = None;
                } else if let Some(rec) = current.as_mut() {
                    if name == "link" {
                        if let Some(link) = link_attrs(&e) {
                            rec.links.push(link);
                        }
                    }
                    field = Some(name);
                    buf.clear();
                }
            }
            Event::Empty(e) => {
                if let Some(rec) = current.as_mut() {
                    if local_name(&e) == "link" {
                        if let Some(link) = link_attrs(&e) {
                            rec.links.push(link);
                        }
                    }
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::GeneralRef(r) => {
                if field.is_some() {
                    buf.push('&');
                    buf.push_str(&String::from_utf8_lossy(&r));
                    buf.push(';');
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                if name == record {
                    if let Some(rec) = current.take() {
                        out.push(rec);
                    }
                    field = None;
                } else if let (Some(rec), Some(f)) = (current.as_mut(), field.as_ref()) {
                    if *f == name {
                        let text = html_escape::decode_html_entities(buf.trim()).to_string();
                        let slot = rec.fields.entry(name).or_default();
                        if slot.is_empty() {
                            *slot = text;
                        }
                        field = None;
                        buf.clear();
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn clean_description(raw: &str) -> Option<String> {
    let text = html_to_text(raw);
    (!text.trim().is_empty()).then_some(text)
}

fn absolute(base: &Url, link: &str) -> Option<String> {
    resolve_link(base, link).map(|u| u.to_string())
}

/// Parse RSS 2.0 / RSS 1.0 `<item>` elements.
pub fn parse_rss_items(xml: &str, base: &Url) -> Result<Vec<FeedItem>> {
    let records = collect_records(xml, "item")?;
    Ok(records
        .into_iter()
        .filter_map(|rec| {
            let link = rec
                .field(&["link", "guid"])
                .map(str::to_string)
                .or_else(|| rec.links.first().map(|(_, h)| h.clone()))?;
            let link = absolute(base, &link)?;
            Some(FeedItem {
                title: collapse_whitespace(rec.field(&["title"]).unwrap_or_default()),
                link,
                published_at: rec.field(&["pubdate", "date", "published", "updated"]).and_then(parse_date),
                description: rec.field(&["encoded", "description"]).and_then(clean_description),
            })
        })
        .collect())
}

/// Parse Atom `<entry>` elements, preferring `rel="alternate"` links.
pub fn parse_atom_entries(xml: &str, base: &Url) -> Result<Vec<FeedItem>> {
    let records = collect_records(xml, "entry")?;
    Ok(records
        .into_iter()
        .filter_map(|rec| {
            let href = rec
                .links
                .iter()
                .find(|(rel, _)| rel.as_deref().is_none_or(|r| r == "alternate"))
                .or_else(|| rec.links.first())
                .map(|(_, h)| h.clone())
                .or_else(|| rec.field(&["link", "id"]).map(str::to_string))?;
            let link = absolute(base, &href)?;
            Some(FeedItem {
                title: collapse_whitespace(rec.field(&["title"]).unwrap_or_default()),
                link,
                published_at: rec.field(&["published", "updated", "issued"]).and_then(parse_date),
                description: rec.field(&["summary", "content"]).and_then(clean_description),
            })
        })
        .collect())
}

/// Derive a readable title from a URL's last meaningful path segment.
///
/// `/news/local/flooding-closes-ky-80.html` → `Flooding closes ky 80`.
pub fn title_from_url(link: &str) -> String {
    let Ok(url) = Url::parse(link) else {
        return link.to_string();
    };
    let segment = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .filter(|s| !s.chars().all(|c| c.is_ascii_digit()))
        .last()
        .unwrap_or_default();
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let stem = match decoded.rsplit_once('.') {
        Some((stem, ext)) if ext.len() <= 5 && !stem.is_empty() => stem.to_string(),
        _ => decoded,
    };
    let words = collapse_whitespace(&stem.replace(['-', '_', '+'], " "));
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => url.host_str().unwrap_or(link).to_string(),
    }
}

/// Parse a sitemap `<urlset>`, synthesizing items from `<loc>` entries.
pub fn parse_urlset(xml: &str, base: &Url) -> Result<Vec<FeedItem>> {
    let records = collect_records(xml, "url")?;
    Ok(records
        .into_iter()
        .filter_map(|rec| {
            let link = absolute(base, rec.field(&["loc"])?)?;
            let title = rec
                .field(&["title"])
                .map(collapse_whitespace)
                .unwrap_or_else(|| title_from_url(&link));
            Some(FeedItem {
                title,
                published_at: rec
                    .field(&["lastmod", "publication_date", "updated"])
                    .and_then(parse_date),
                link,
                description: None,
            })
        })
        .collect())
}

/// Parse a `<sitemapindex>`, returning child locations newest first.
pub fn parse_sitemap_index(xml: &str, base: &Url) -> Result<Vec<String>> {
    let records = collect_records(xml, "sitemap")?;
    let mut children: Vec<(Option<DateTime<Utc>>, String)> = records
        .into_iter()
        .filter_map(|rec| {
            let loc = absolute(base, rec.field(&["loc"])?)?;
            Some((rec.field(&["lastmod"]).and_then(parse_date), loc))
        })
        .collect();
    // Stable sort: undated children keep document order after dated ones.
    children.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(children.into_iter().map(|(_, loc)| loc).collect())
}

/// Parse any supported syndication document.
///
/// RSS items are tried first, then Atom entries; sitemap indexes and urlsets
/// are recognised by their root element.
pub fn parse_feed(body: &str, base: &Url) -> Result<ParsedFeed> {
    let root = root_element(body)
        .ok_or_else(|| IngestError::Parse("document has no root element".into()))?;
    match root.as_str() {
        "sitemapindex" => Ok(ParsedFeed::SitemapIndex(parse_sitemap_index(body, base)?)),
        "urlset" => Ok(ParsedFeed::Items(parse_urlset(body, base)?)),
        "html" => Err(IngestError::Parse("candidate is an html page, not a feed".into())),
        _ => {
            let items = parse_rss_items(body, base)?;
            if !items.is_empty() {
                return Ok(ParsedFeed::Items(items));
            }
            Ok(ParsedFeed::Items(parse_atom_entries(body, base)?))
        }
    }
}

/// Feed URLs advertised by `<link rel="alternate">` tags on a homepage.
pub fn alternate_feed_links(base: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"link[rel~="alternate"][href]"#).unwrap();
    document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("type")
                .map(|t| {
                    let t = t.to_ascii_lowercase();
                    t.contains("rss+xml") || t.contains("atom+xml")
                })
                .unwrap_or(false)
        })
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| absolute(base, href))
        .collect()
}

/// Ordered, de-duplicated feed candidates for a source root.
///
/// Feeds the homepage advertises come first, then the conventional suffixes.
pub fn candidate_urls(root: &Url, homepage_html: Option<&str>) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(html) = homepage_html {
        candidates.extend(alternate_feed_links(root, html));
    }
    let origin = root.origin().ascii_serialization();
    let base_path = root.path().trim_end_matches('/');
    for suffix in FEED_SUFFIXES {
        candidates.push(format!("{origin}{base_path}{suffix}"));
        if !base_path.is_empty() {
            candidates.push(format!("{origin}{suffix}"));
        }
    }
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.example.com/").unwrap()
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example News</title>
    <link>https://www.example.com</link>
    <item>
      <title>Flooding closes KY 80 &amp; US 23</title>
      <link>https://www.example.com/news/flooding-closes-ky-80</link>
      <pubDate>Tue, 06 May 2025 14:30:00 GMT</pubDate>
      <description><![CDATA[<p>Crews are <b>working</b> to clear debris.</p>]]></description>
    </item>
    <item>
      <title>Relative link story</title>
      <link>/sports/tigers-win</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <link href="https://www.example.com/" rel="self"/>
  <entry>
    <title>Council approves budget</title>
    <link rel="alternate" href="https://www.example.com/government/budget"/>
    <link rel="enclosure" href="https://www.example.com/img/budget.jpg"/>
    <updated>2025-05-06T10:00:00Z</updated>
    <summary>The council voted 5-2.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_rss_items(RSS, &base()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Flooding closes KY 80 & US 23");
        assert_eq!(items[0].link, "https://www.example.com/news/flooding-closes-ky-80");
        assert!(items[0].published_at.is_some());
        assert_eq!(
            items[0].description.as_deref(),
            Some("Crews are working to clear debris.")
        );
        assert_eq!(items[1].link, "https://www.example.com/sports/tigers-win");
    }

    #[test]
    fn test_parse_feed_falls_back_to_atom() {
        let ParsedFeed::Items(items) = parse_feed(ATOM, &base()).unwrap() else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://www.example.com/government/budget");
        assert_eq!(items[0].description.as_deref(), Some("The council voted 5-2."));
    }

    #[test]
    fn test_parse_urlset_synthesizes_titles() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                xmlns:news="http://www.google.com/schemas/sitemap-news/0.9">
          <url><loc>https://www.example.com/news/local/bridge-reopens-after-repairs.html</loc>
               <lastmod>2025-05-06</lastmod></url>
          <url><loc>https://www.example.com/story/12345</loc>
               <news:news><news:publication_date>2025-05-05T08:00:00Z</news:publication_date>
               <news:title>Named in news sitemap</news:title></news:news></url>
        </urlset>"#;
        let ParsedFeed::Items(items) = parse_feed(xml, &base()).unwrap() else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Bridge reopens after repairs");
        assert!(items[0].published_at.is_some());
        assert_eq!(items[1].title, "Named in news sitemap");
        assert!(items[1].published_at.is_some());
    }

    #[test]
    fn test_parse_sitemap_index_orders_newest_first() {
        let xml = r#"<sitemapindex>
          <sitemap><loc>https://www.example.com/sitemap-old.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
          <sitemap><loc>https://www.example.com/sitemap-new.xml</loc><lastmod>2025-05-01</lastmod></sitemap>
        </sitemapindex>"#;
        let ParsedFeed::SitemapIndex(children) = parse_feed(xml, &base()).unwrap() else {
            panic!("expected sitemap index");
        };
        assert_eq!(
            children,
            vec![
                "https://www.example.com/sitemap-new.xml".to_string(),
                "https://www.example.com/sitemap-old.xml".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_feed_rejects_html() {
        let html = "<html><head><title>Home</title></head><body></body></html>";
        assert!(parse_feed(html, &base()).is_err());
    }

    #[test]
    fn test_title_from_url() {
        assert_eq!(
            title_from_url("https://x.com/news/flooding-closes-ky-80.html"),
            "Flooding closes ky 80"
        );
        assert_eq!(
            title_from_url("https://x.com/2025/05/06/mayor_race%20heats-up/12345"),
            "Mayor race heats up"
        );
        assert_eq!(title_from_url("https://x.com/"), "x.com");
    }

    #[test]
    fn test_candidate_urls_prefers_advertised_feeds() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/custom/feed.rss">
            <link rel="alternate" type="text/html" href="/amp">
            <link rel="stylesheet" href="/site.css">
        </head></html>"#;
        let candidates = candidate_urls(&base(), Some(html));
        assert_eq!(candidates[0], "https://www.example.com/custom/feed.rss");
        assert!(candidates.contains(&"https://www.example.com/feed".to_string()));
        assert!(candidates.contains(&"https://www.example.com/index.xml".to_string()));
        assert!(!candidates.iter().any(|c| c.ends_with("/amp")));
    }

    #[test]
    fn test_candidate_urls_for_section_root() {
        let root = Url::parse("https://www.example.com/news/").unwrap();
        let candidates = candidate_urls(&root, None);
        assert_eq!(candidates[0], "https://www.example.com/news/feed");
        assert!(candidates.contains(&"https://www.example.com/feed".to_string()));
    }
}
