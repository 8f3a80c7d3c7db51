//! Readability-style main-content extraction.
//!
//! Paragraphs outside navigation, boilerplate and widget containers score
//! their parent (and, at half weight, grandparent) element by length and comma
//! density. The best-scoring container is re-emitted as minimal HTML holding
//! only paragraph-level blocks.

use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use crate::utils::collapse_whitespace;

/// Paragraphs shorter than this are captions, datelines or buttons.
const MIN_PARAGRAPH_CHARS: usize = 25;
/// Below this much text the page is not considered an article.
const MIN_ARTICLE_CHARS: usize = 140;

const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "iframe",
    "figure", "button", "svg",
];

const NOISE_HINTS: &[&str] = &[
    "comment", "share", "social", "related", "promo", "newsletter", "subscribe", "advert",
    "sidebar", "breadcrumb", "cookie", "signup",
];

const BLOCK_TAGS: &[&str] = &["p", "h2", "h3", "h4", "blockquote", "li", "pre"];

#[derive(Debug, Clone, PartialEq)]
pub struct ReadableArticle {
    pub title: Option<String>,
    /// Paragraphs separated by blank lines.
    pub text: String,
    /// Cleaned markup: `<p>`, `<h2>`–`<h4>` and `<blockquote>` only.
    pub html: String,
}

fn is_noise(el: &Element) -> bool {
    if NOISE_TAGS.contains(&el.name()) {
        return true;
    }
    let marker = format!(
        "{} {}",
        el.attr("class").unwrap_or_default(),
        el.attr("id").unwrap_or_default()
    )
    .to_ascii_lowercase();
    NOISE_HINTS.iter().any(|hint| marker.contains(hint))
}

fn in_noise(el: ElementRef<'_>) -> bool {
    is_noise(el.value())
        || el
            .ancestors()
            .filter_map(|n| n.value().as_element())
            .any(is_noise)
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn paragraph_score(text: &str) -> f64 {
    1.0 + text.matches(',').count() as f64 + (text.len() as f64 / 100.0).min(3.0)
}

/// `<h1>` outside boilerplate, else `<title>` without a trailing site name.
fn article_title(document: &Html) -> Option<String> {
    let h1 = Selector::parse("h1").unwrap();
    let heading = document
        .select(&h1)
        .filter(|el| !in_noise(*el))
        .map(element_text)
        .find(|t| t.split_whitespace().count() >= 2);
    if heading.is_some() {
        return heading;
    }
    let title = Selector::parse("title").unwrap();
    let raw = document.select(&title).map(element_text).find(|t| !t.is_empty())?;
    for sep in [" | ", " - ", " – ", " — ", " :: "] {
        if let Some((head, _site)) = raw.rsplit_once(sep) {
            if head.split_whitespace().count() >= 3 {
                return Some(head.trim().to_string());
            }
        }
    }
    Some(raw)
}

/// Extract the main article content, or `None` when nothing article-like is
/// found.
pub fn extract_readable(html: &str) -> Option<ReadableArticle> {
    let document = Html::parse_document(html);
    let p = Selector::parse("p").unwrap();

    let mut scores = HashMap::new();
    let mut order = Vec::new();
    for paragraph in document.select(&p) {
        if in_noise(paragraph) {
            continue;
        }
        let text = element_text(paragraph);
        if text.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = paragraph_score(&text);
        let Some(parent) = paragraph.parent() else {
            continue;
        };
        if !scores.contains_key(&parent.id()) {
            order.push(parent.id());
        }
        *scores.entry(parent.id()).or_insert(0.0) += score;
        if let Some(grandparent) = parent.parent() {
            if !scores.contains_key(&grandparent.id()) {
                order.push(grandparent.id());
            }
            *scores.entry(grandparent.id()).or_insert(0.0) += score / 2.0;
        }
    }

    // First-seen wins ties so the result does not depend on hash order.
    let mut best = None;
    let mut best_score = 0.0;
    for id in order {
        let score = scores[&id];
        if score > best_score {
            best = Some(id);
            best_score = score;
        }
    }
    let container = document.tree.get(best?).and_then(ElementRef::wrap)?;

    let blocks = Selector::parse(&BLOCK_TAGS.join(", ")).unwrap();
    let mut paragraphs = Vec::new();
    let mut cleaned = String::new();
    for block in container.select(&blocks) {
        if in_noise(block) {
            continue;
        }
        let nested = block
            .ancestors()
            .take_while(|a| a.id() != container.id())
            .filter_map(|a| a.value().as_element())
            .any(|a| BLOCK_TAGS.contains(&a.name()));
        if nested {
            continue;
        }
        let text = element_text(block);
        if text.is_empty() {
            continue;
        }
        let tag = match block.value().name() {
            "li" | "pre" => "p",
            other => other,
        };
        cleaned.push_str(&format!("<{tag}>{}</{tag}>\n", html_escape::encode_text(&text)));
        paragraphs.push(text);
    }

    let text = paragraphs.join("\n\n");
    if text.chars().count() < MIN_ARTICLE_CHARS {
        return None;
    }
    Some(ReadableArticle {
        title: article_title(&document),
        text,
        html: cleaned,
    })
}
