//! Geographic relevance: which Kentucky counties and cities an article is
//! about, and whether it is about Kentucky at all.
//!
//! Place names in the target state are shared with counties, cities and
//! people elsewhere, so every detector layers the same two defences:
//!
//! - **state context**: an explicit "Kentucky" / standalone `KY` / `Ky.`
//!   anywhere in the text
//! - **disqualification window**: another state's name or postal code within
//!   a fixed character span of the match rejects it
//!
//! [`county`] and [`city`] hold the detectors; [`gazetteer`] the static data.

pub mod city;
pub mod county;
pub mod gazetteer;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GeoConfig;
use city::{CityMatch, CityRules, detect_cities};
use gazetteer::{HIGH_AMBIGUITY_CITIES, TARGET_STATE, US_STATES};

static STATE_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:\bkentucky\b)|\bKY\b|\bKy\.").unwrap());

static OTHER_STATE_NAMES: Lazy<Regex> = Lazy::new(|| {
    let names: Vec<String> = US_STATES
        .iter()
        .filter(|(name, _)| *name != TARGET_STATE)
        .map(|(name, _)| regex::escape(name).replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", names.join("|"))).unwrap()
});

static OTHER_STATE_CODES: Lazy<Regex> = Lazy::new(|| {
    let codes: Vec<&str> = US_STATES
        .iter()
        .filter(|(name, _)| *name != TARGET_STATE)
        .map(|(_, code)| *code)
        .collect();
    Regex::new(&format!(r"\b(?:{})\b", codes.join("|"))).unwrap()
});

/// Explicit target-state mention anywhere in `text`. Also the fallback
/// state-relevance keyword test.
pub fn has_state_context(text: &str) -> bool {
    STATE_CONTEXT.is_match(text)
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Whether another state is named within `window` bytes on either side of
/// `start..end`. The match span itself is never inspected.
pub fn disqualified(text: &str, start: usize, end: usize, window: usize) -> bool {
    let before = &text[floor_boundary(text, start.saturating_sub(window))..start];
    let after = &text[end..ceil_boundary(text, end + window)];
    [before, after]
        .iter()
        .any(|part| OTHER_STATE_NAMES.is_match(part) || OTHER_STATE_CODES.is_match(part))
}

/// Everything the geo detectors found in one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoResult {
    /// Gazetteer spellings, in gazetteer order.
    pub counties: Vec<String>,
    /// In order of first mention.
    pub cities: Vec<CityMatch>,
    pub state_keyword: bool,
}

impl GeoResult {
    /// Detected counties followed by the counties of detected cities,
    /// without repeats.
    pub fn regions(&self) -> Vec<String> {
        self.counties
            .iter()
            .map(String::as_str)
            .chain(self.cities.iter().map(|c| c.county))
            .unique()
            .map(str::to_string)
            .collect()
    }

    pub fn locality(&self) -> Option<String> {
        self.cities.first().map(|c| c.name.clone())
    }

    pub fn is_state_relevant(&self) -> bool {
        !self.counties.is_empty() || !self.cities.is_empty() || self.state_keyword
    }
}

/// Configured county, city and keyword detection.
#[derive(Debug, Clone)]
pub struct GeoDetector {
    high_ambiguity: Vec<String>,
    window: usize,
    cue_window_words: usize,
}

impl GeoDetector {
    pub fn new(config: &GeoConfig) -> Self {
        let high_ambiguity = if config.high_ambiguity_cities.is_empty() {
            HIGH_AMBIGUITY_CITIES.iter().map(|c| c.to_lowercase()).collect()
        } else {
            config.high_ambiguity_cities.iter().map(|c| c.to_lowercase()).collect()
        };
        Self {
            high_ambiguity,
            window: config.disqualification_window,
            cue_window_words: config.cue_window_words,
        }
    }

    pub fn detect(&self, text: &str) -> GeoResult {
        let state_context = has_state_context(text);
        let counties = county::detect_counties(text, state_context, self.window);
        let rules = CityRules {
            state_context,
            high_ambiguity: &self.high_ambiguity,
            window: self.window,
            cue_window_words: self.cue_window_words,
        };
        GeoResult {
            counties: counties.into_iter().map(str::to_string).collect(),
            cities: detect_cities(text, &rules),
            state_keyword: state_context,
        }
    }
}

impl Default for GeoDetector {
    fn default() -> Self {
        Self::new(&GeoConfig::default())
    }
}
