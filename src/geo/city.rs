//! City mention detection over the city → county lookup.

use once_cell::sync::Lazy;
use regex::Regex;

use super::disqualified;
use super::gazetteer::KY_CITIES;

/// Capitalized words that follow a place name without making it a person's
/// name ("London Police", "Paris Pike").
const INSTITUTIONAL_WORDS: &[&str] = &[
    "County", "City", "Police", "Fire", "Metro", "Mayor", "Council", "Commission", "Public",
    "Schools", "School", "High", "Middle", "Elementary", "Independent", "Community", "College",
    "University", "Hospital", "Medical", "Regional", "Airport", "Area", "Road", "Street",
    "Avenue", "Pike", "Water", "Utilities", "Housing", "Parks", "Library", "Chamber", "Board",
    "Planning", "Tourism", "Downtown", "Mall", "Plant", "Center", "Courthouse", "Clinic",
    "Health", "Department", "Government", "Municipal", "Utility", "Electric", "Church",
];

/// Capitalized words that follow a place name in running news copy without
/// being a surname.
const NON_SURNAME_WORDS: &[&str] = &[
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug", "Sept",
    "Sep", "Oct", "Nov", "Dec", "Today", "Tonight", "Yesterday", "Tomorrow", "Morning",
    "Evening", "Night", "Officials", "Authorities", "Residents", "Sheriff", "Firefighters",
    "Crews", "Emergency", "State", "The", "This", "That", "On", "After", "When", "While",
];

const LOCATIVE_BEFORE: &[&str] = &["in", "at", "from", "near", "outside", "downtown"];
const LOCATIVE_AFTER: &[&str] = &["county", "ky", "kentucky"];

struct CityPattern {
    name: &'static str,
    county: &'static str,
    regex: Regex,
}

/// Longest names first so "Russell Springs" is consumed before "Russell".
static CITY_PATTERNS: Lazy<Vec<CityPattern>> = Lazy::new(|| {
    let mut cities: Vec<&(&str, &str)> = KY_CITIES.iter().collect();
    cities.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
    cities
        .into_iter()
        .map(|&(name, county)| CityPattern {
            name,
            county,
            regex: Regex::new(&format!(
                r"\b(?:{}|{})\b",
                regex::escape(name),
                regex::escape(&name.to_uppercase())
            ))
            .unwrap(),
        })
        .collect()
});

static FOLLOWING_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ ([A-Z][a-z]+)\b").unwrap());
static STATE_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^,?\s*(?:(?i:kentucky)\b|KY\b|Ky\.)").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct CityMatch {
    /// Lowercased city name.
    pub name: String,
    pub county: &'static str,
    /// Byte offset of the first accepted mention.
    pub offset: usize,
}

/// Inputs shared by every city decision in one text.
pub struct CityRules<'a> {
    pub state_context: bool,
    /// Lowercased names that always need a locative cue.
    pub high_ambiguity: &'a [String],
    pub window: usize,
    pub cue_window_words: usize,
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// A locative cue ("in", "near", "city of", "county", "Ky.") within
/// `words` words of the mention.
fn has_cue(text: &str, start: usize, end: usize, words: usize) -> bool {
    let before: Vec<String> = text[..start]
        .split_whitespace()
        .rev()
        .take(words)
        .map(normalize_word)
        .collect();
    let after: Vec<String> = text[end..]
        .split_whitespace()
        .take(words)
        .map(normalize_word)
        .collect();
    if before.iter().any(|w| LOCATIVE_BEFORE.contains(&w.as_str())) {
        return true;
    }
    // `before` is reversed: "city of X" reads as ["of", "city"].
    if before.windows(2).any(|pair| pair[0] == "of" && pair[1] == "city") {
        return true;
    }
    before
        .iter()
        .chain(after.iter())
        .any(|w| LOCATIVE_AFTER.contains(&w.as_str()))
}

/// "Paris Hilton": a capitalized, non-institutional word right after the
/// name.
fn followed_by_surname(text: &str, end: usize) -> bool {
    FOLLOWING_WORD
        .captures(&text[end..])
        .and_then(|c| c.get(1))
        .map(|w| w.as_str())
        .is_some_and(|w| !INSTITUTIONAL_WORDS.contains(&w) && !NON_SURNAME_WORDS.contains(&w))
}

/// ", Kentucky" or " Ky." directly after the name.
fn state_qualified(text: &str, end: usize) -> bool {
    STATE_QUALIFIER.is_match(&text[end..])
}

fn overlaps(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|&(s, e)| start < e && s < end)
}

/// Accepted cities, ordered by first accepted mention.
pub fn detect_cities(text: &str, rules: &CityRules<'_>) -> Vec<CityMatch> {
    let mut consumed: Vec<(usize, usize)> = Vec::new();
    let mut accepted = Vec::new();

    for pattern in CITY_PATTERNS.iter() {
        let mentions: Vec<(usize, usize)> = pattern
            .regex
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .filter(|&(s, e)| !overlaps(&consumed, s, e))
            .collect();
        if mentions.is_empty() {
            continue;
        }
        consumed.extend(mentions.iter().copied());

        let lower = pattern.name.to_lowercase();
        let high_ambiguity = rules.high_ambiguity.contains(&lower);
        let single = mentions.len() == 1;

        if single && followed_by_surname(text, mentions[0].1) {
            continue;
        }

        let hit = mentions
            .iter()
            .copied()
            .filter(|&(s, e)| state_qualified(text, e) || !disqualified(text, s, e, rules.window))
            .find(|&(s, e)| {
                let cue = || has_cue(text, s, e, rules.cue_window_words);
                if high_ambiguity {
                    cue()
                } else if single {
                    cue() || rules.state_context
                } else {
                    true
                }
            });

        if let Some((offset, _)) = hit {
            accepted.push(CityMatch {
                name: lower,
                county: pattern.county,
                offset,
            });
        }
    }

    accepted.sort_by_key(|c| c.offset);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::gazetteer::HIGH_AMBIGUITY_CITIES;
    use crate::geo::has_state_context;

    fn detect(text: &str) -> Vec<String> {
        let high: Vec<String> = HIGH_AMBIGUITY_CITIES.iter().map(|c| c.to_lowercase()).collect();
        let rules = CityRules {
            state_context: has_state_context(text),
            high_ambiguity: &high,
            window: 150,
            cue_window_words: 4,
        };
        detect_cities(text, &rules).into_iter().map(|c| c.name).collect()
    }

    #[test]
    fn test_longest_name_wins() {
        assert_eq!(detect("The festival was held in Bowling Green, Kentucky on Saturday."), vec!["bowling green"]);
        assert_eq!(detect("A new clinic opened in Russell Springs this week."), vec!["russell springs"]);
    }

    #[test]
    fn test_high_ambiguity_needs_cue() {
        assert!(detect("Designers love Paris fashion and style, say shoppers across Kentucky.").is_empty());
        assert!(detect("London Bridge is a landmark.").is_empty());
        assert_eq!(detect("A fire in London destroyed a barn, Laurel County officials said."), vec!["london"]);
    }

    #[test]
    fn test_single_bare_mention_needs_cue_or_context() {
        assert!(detect("Pikeville announced a budget surplus.").is_empty());
        assert_eq!(detect("Pikeville announced a budget surplus, the Kentucky city said."), vec!["pikeville"]);
        assert_eq!(detect("Students from Pikeville won the contest."), vec!["pikeville"]);
    }

    #[test]
    fn test_surname_is_discarded() {
        assert!(detect("Coach Murray Barnes said the team in Kentucky is ready.").is_empty());
        assert_eq!(detect("The Corbin Police Department in Kentucky made an arrest."), vec!["corbin"]);
    }

    #[test]
    fn test_weekday_or_month_after_name_is_not_a_surname() {
        assert_eq!(detect("A fire in Pikeville Tuesday destroyed a barn."), vec!["pikeville"]);
        assert_eq!(detect("The festival in Corbin March 14 drew a crowd."), vec!["corbin"]);
        assert_eq!(detect("Flooding near Somerset Officials said roads were closed."), vec!["somerset"]);
    }

    #[test]
    fn test_disqualified_by_other_state() {
        assert!(detect("Police in Lexington, Massachusetts responded to the call.").is_empty());
        assert_eq!(detect("Police in Lexington, Ky. responded near the Ohio border."), vec!["lexington"]);
    }

    #[test]
    fn test_dateline_uppercase() {
        assert_eq!(detect("HAZARD, Ky. (WYMT) - Crews worked overnight."), vec!["hazard"]);
    }

    #[test]
    fn test_ordered_by_first_mention() {
        assert_eq!(
            detect("Crews from Somerset drove to Corbin in Kentucky."),
            vec!["somerset", "corbin"]
        );
    }
}
