//! Gates applied to every generated summary before it is accepted.
//!
//! - length band relative to the source
//! - numeric fidelity: every number in the summary must come from the source
//! - sentence completeness (applied to fallback summaries too)

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::error::{IngestError, Result};
use crate::utils::word_count;

/// Band bounds as a percentage of source words.
pub const BAND_LOW_PERCENT: usize = 35;
pub const BAND_HIGH_PERCENT: usize = 50;
/// Sources shorter than this use [`SHORT_SOURCE_MAX_WORDS`] as the upper bound.
pub const SHORT_SOURCE_WORDS: usize = 400;
pub const SHORT_SOURCE_MAX_WORDS: usize = 200;
/// A summary under the band is still accepted at or above this many words.
pub const MIN_SUMMARY_WORDS: usize = 30;

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "st", "jr", "sr", "gov", "sen", "rep", "lt", "sgt", "ky", "co",
    "no", "vs", "ave", "rd",
];

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]["'”’)]*(?:\s|$)"#).unwrap());

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap());

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:1[89]|20)\d{2}$").unwrap());

const CLOSERS: [char; 5] = ['"', '\'', '”', '’', ')'];

static LEADING_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*(?:\*\*)?summary(?:\*\*)?\s*:\s*").unwrap());

/// Byte offsets just past each sentence's closing punctuation (and any
/// closing quotes). Common abbreviations and initials are skipped.
pub fn sentence_ends(text: &str) -> Vec<usize> {
    SENTENCE_END
        .find_iter(text)
        .filter_map(|m| {
            let end = m.start() + m.as_str().trim_end().len();
            if text[m.start()..].starts_with('.') {
                let word = text[..m.start()]
                    .rsplit(char::is_whitespace)
                    .next()
                    .unwrap_or("")
                    .trim_start_matches(|c: char| !c.is_alphanumeric());
                let lower = word.to_lowercase();
                let initial = word.chars().count() == 1 && word.chars().all(char::is_uppercase);
                if initial || ABBREVIATIONS.contains(&lower.as_str()) {
                    return None;
                }
            }
            Some(end)
        })
        .collect()
}

pub fn ends_with_terminal(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(CLOSERS)
        .ends_with(['.', '!', '?'])
}

/// Drop a trailing fragment after the last complete sentence, or close the
/// text with a period when it has no complete sentence.
pub fn ensure_terminal(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || ends_with_terminal(trimmed) {
        return trimmed.to_string();
    }
    if let Some(&end) = sentence_ends(trimmed).last() {
        return trimmed[..end].trim_end().to_string();
    }
    // The period goes inside any closing quotes or parentheses.
    let dangling = |c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '–');
    let body = trimmed.trim_end_matches(dangling);
    let stem = body.trim_end_matches(CLOSERS);
    let closers = &body[stem.len()..];
    format!("{}.{closers}", stem.trim_end_matches(dangling))
}

/// At most `max_words` words, cut at the last sentence boundary inside that
/// limit when there is one.
pub fn truncate_to_words(text: &str, max_words: usize) -> String {
    if word_count(text) <= max_words {
        return ensure_terminal(text);
    }
    // Offset of the end of the max_words-th word.
    let mut offset = 0;
    let mut in_word = false;
    let mut seen = 0;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                seen += 1;
                if seen == max_words {
                    offset = i;
                    break;
                }
            }
            in_word = false;
        } else {
            in_word = true;
        }
    }
    let prefix = &text[..offset];
    match sentence_ends(prefix).last() {
        Some(&end) => prefix[..end].trim_end().to_string(),
        None => ensure_terminal(prefix),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBand {
    pub low: usize,
    pub high: usize,
}

pub fn length_band(source_words: usize) -> LengthBand {
    let low = (source_words * BAND_LOW_PERCENT).div_ceil(100);
    let high = if source_words < SHORT_SOURCE_WORDS {
        SHORT_SOURCE_MAX_WORDS.min(source_words)
    } else {
        source_words * BAND_HIGH_PERCENT / 100
    };
    LengthBand {
        low,
        high: high.max(low),
    }
}

/// Reject summaries under both the band and the word floor; truncate ones
/// over the band.
pub fn check_length(summary: &str, source_words: usize) -> Result<String> {
    let words = word_count(summary);
    let band = length_band(source_words);
    if words < band.low && words < MIN_SUMMARY_WORDS {
        return Err(IngestError::Validation(format!(
            "summary has {words} words, band starts at {}",
            band.low
        )));
    }
    if words > band.high {
        return Ok(truncate_to_words(summary, band.high));
    }
    Ok(summary.to_string())
}

fn normalize_number(raw: &str) -> String {
    raw.replace(',', "")
}

/// Every number in the summary must also appear among the source's numbers.
/// A four-digit year passes if it appears anywhere in the source text.
pub fn check_numbers(summary: &str, source: &str) -> Result<()> {
    let known: HashSet<String> = NUMBER
        .find_iter(source)
        .map(|m| normalize_number(m.as_str()))
        .collect();

    for m in NUMBER.find_iter(summary) {
        let value = normalize_number(m.as_str());
        if known.contains(&value) {
            continue;
        }
        if YEAR.is_match(&value) && source.contains(value.as_str()) {
            continue;
        }
        return Err(IngestError::Validation(format!(
            "number {} does not appear in the source",
            m.as_str().trim_end_matches(',')
        )));
    }
    Ok(())
}

/// Strip wrapping quotes and a leading "Summary:" label from a model reply.
fn clean_reply(reply: &str) -> String {
    let text = LEADING_LABEL.replace(reply.trim(), "");
    text.trim()
        .trim_matches(|c: char| c == '"' || c == '“' || c == '”')
        .trim()
        .to_string()
}

/// Run every gate over a generated summary. On success returns the
/// (possibly truncated) summary ending in terminal punctuation.
pub fn validate_summary(candidate: &str, source: &str) -> Result<String> {
    let cleaned = clean_reply(candidate);
    if cleaned.is_empty() {
        return Err(IngestError::Validation("empty summary".into()));
    }
    check_numbers(&cleaned, source)?;
    let sized = check_length(&cleaned, word_count(source))?;
    Ok(ensure_terminal(&sized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_ends_skip_abbreviations() {
        let text = "Crews in Hazard, Ky. worked late. Gov. Smith visited! Then left";
        let ends = sentence_ends(text);
        assert_eq!(ends.len(), 2);
        assert_eq!(&text[..ends[0]], "Crews in Hazard, Ky. worked late.");
        assert!(text[..ends[1]].ends_with("visited!"));
    }

    #[test]
    fn test_ensure_terminal() {
        assert_eq!(ensure_terminal("All done."), "All done.");
        assert_eq!(ensure_terminal("He said \"yes.\""), "He said \"yes.\"");
        assert_eq!(ensure_terminal("First sentence. Second one trails"), "First sentence.");
        assert_eq!(ensure_terminal("No punctuation at all,"), "No punctuation at all.");
    }

    #[test]
    fn test_closing_quote_needs_punctuation_before_it() {
        assert!(!ends_with_terminal("The mayor called it \"a good start\""));
        assert!(ends_with_terminal("The mayor called it \"a good start.\""));
        assert_eq!(
            ensure_terminal("The mayor called it \"a good start\""),
            "The mayor called it \"a good start.\""
        );
    }

    #[test]
    fn test_truncate_to_words_prefers_sentence_boundary() {
        let text = "One two three. Four five six seven. Eight nine ten.";
        assert_eq!(truncate_to_words(text, 5), "One two three.");
        assert_eq!(truncate_to_words("alpha beta gamma delta", 2), "alpha beta.");
        assert_eq!(truncate_to_words(text, 50), text);
    }

    #[test]
    fn test_length_band() {
        assert_eq!(length_band(1000), LengthBand { low: 350, high: 500 });
        assert_eq!(length_band(300), LengthBand { low: 105, high: 200 });
    }

    #[test]
    fn test_check_length() {
        // Under the band but above the floor is accepted.
        let thirty_five = vec!["word"; 35].join(" ");
        assert!(check_length(&thirty_five, 1000).is_ok());
        let twenty = vec!["word"; 20].join(" ");
        assert!(check_length(&twenty, 1000).is_err());
        let long = vec!["word"; 600].join(" ");
        assert_eq!(word_count(&check_length(&long, 1000).unwrap()), 500);
    }

    #[test]
    fn test_numeric_fidelity() {
        let source = "The county will spend $1,200,000, about 12 percent of the budget, by 2026.";
        assert!(check_numbers("Spending is 12% of the budget.", source).is_ok());
        assert!(check_numbers("Spending is 1200000 dollars through 2026.", source).is_ok());
        assert!(check_numbers("Spending rose 15 percent.", source).is_err());
        assert!(check_numbers("The plan dates to 1998.", source).is_err());
        assert!(check_numbers("Costs hit 3 million.", source).is_err());
    }

    #[test]
    fn test_bare_numbers_must_come_from_source() {
        let source = "Firefighters from 4 departments responded. About 30 people were evacuated on May 6.";
        assert!(check_numbers("Crews from 4 departments moved 30 people out.", source).is_ok());
        assert!(check_numbers("The fire displaced 47 people.", source).is_err());
        assert!(check_numbers("Crews from 5 departments responded.", source).is_err());
        assert!(validate_summary(&format!("{} 47 people were hurt.", vec!["Crews responded"; 20].join(" and ")), source).is_err());
    }

    #[test]
    fn test_year_passes_when_anywhere_in_source() {
        let source = "The FY2024-25 plan was adopted by the board.";
        assert!(check_numbers("The plan covers 2024.", source).is_ok());
        assert!(check_numbers("The plan covers 2023.", source).is_err());
    }

    #[test]
    fn test_validate_summary_cleans_reply() {
        let source = vec!["The board met on Tuesday to talk about roads."; 10].join(" ");
        let reply = format!("Summary: {}", vec!["The board met on Tuesday to talk about roads"; 4].join(" and "));
        let summary = validate_summary(&reply, &source).unwrap();
        assert!(summary.starts_with("The board"));
        assert!(ends_with_terminal(&summary));
    }
}
