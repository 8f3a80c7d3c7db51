//! County mention detection.
//!
//! Every `county` / `counties` / `cnty` / `co.` suffix is matched first, then
//! the text just before it is read backwards for one county name or an
//! enumeration of them ("Perry, Knott and Letcher counties").

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::disqualified;
use super::gazetteer::{KY_COUNTIES, county_name};

/// How far before a suffix an enumeration may start.
const ENUMERATION_LOOKBACK: usize = 200;

static SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:counties|county|cnty|co)\b").unwrap());

/// Capitalized or all-caps county names, longest first.
static NAME_ALTERNATION: Lazy<String> = Lazy::new(|| {
    let mut names: Vec<&str> = KY_COUNTIES.to_vec();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names
        .iter()
        .flat_map(|n| [regex::escape(n), regex::escape(&n.to_uppercase())])
        .collect::<Vec<_>>()
        .join("|")
});

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b(?:{})\b", *NAME_ALTERNATION)).unwrap());

static ENUMERATION_TAIL: Lazy<Regex> = Lazy::new(|| {
    let n = &*NAME_ALTERNATION;
    Regex::new(&format!(
        r"\b(?:{n})(?:(?:\s*(?:,|&|/|\band\b|\bor\b)\s*)+(?:{n}))*\s*$"
    ))
    .unwrap()
});

/// A bare `co` only counts as an abbreviation when followed by a period,
/// whitespace, punctuation or the end of text ("co-op" is not a county).
fn is_abbreviation_suffix(text: &str, start: usize, end: usize) -> bool {
    if !text[start..end].eq_ignore_ascii_case("co") {
        return true;
    }
    match text[end..].chars().next() {
        None => true,
        Some(c) => c == '.' || c == ',' || c == ';' || c == ')' || c.is_whitespace(),
    }
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Counties mentioned in `text`, in gazetteer order.
///
/// With `state_context` every suffixed match is accepted; otherwise matches
/// near another state's name or postal code are dropped.
pub fn detect_counties(text: &str, state_context: bool, window: usize) -> Vec<&'static str> {
    let mut found: HashSet<&'static str> = HashSet::new();
    for suffix in SUFFIX.find_iter(text) {
        if !is_abbreviation_suffix(text, suffix.start(), suffix.end()) {
            continue;
        }
        let lookback = floor_boundary(text, suffix.start().saturating_sub(ENUMERATION_LOOKBACK));
        let prefix = &text[lookback..suffix.start()];
        let Some(tail) = ENUMERATION_TAIL.find(prefix) else {
            continue;
        };
        let span_start = lookback + tail.start();
        if !state_context && disqualified(text, span_start, suffix.end(), window) {
            continue;
        }
        for name in NAME.find_iter(tail.as_str()) {
            if let Some(county) = county_name(name.as_str()) {
                found.insert(county);
            }
        }
    }
    KY_COUNTIES
        .iter()
        .copied()
        .filter(|c| found.contains(c))
        .collect()
}
