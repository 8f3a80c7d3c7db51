//! Topic and relevance classification.
//!
//! Two strategies share one fallback path:
//!
//! - [`HeuristicClassifier`]: phrase patterns plus the geo detectors
//! - [`ModelClassifier`]: asks a [`TextModel`] for a JSON verdict, validates
//!   it against the closed category set and the county gazetteer, and
//!   falls back to the heuristic result on any error

use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::api::{TextModel, extract_json_object};
use crate::error::{IngestError, Result};
use crate::geo::gazetteer::county_name;
use crate::geo::{GeoDetector, GeoResult};
use crate::models::{Category, Classification, ExtractedArticle};
use crate::utils::{looks_truncated, truncate_for_log};

/// Characters of the lead sent to the model.
const MODEL_LEAD_CHARS: usize = 1500;

/// Checked in this order; the first category with a matching phrase wins.
pub const CATEGORY_PRIORITY: &[(Category, &[&str])] = &[
    (
        Category::Obituaries,
        &[
            "obituary", "obituaries", "passed away", "funeral home", "funeral service",
            "visitation will be", "survived by", "preceded in death", "celebration of life",
            "in lieu of flowers",
        ],
    ),
    (
        Category::Weather,
        &[
            "national weather service", "severe weather", "winter storm", "winter weather",
            "tornado warning", "tornado watch", "flood warning", "flood watch", "flash flood",
            "heat advisory", "wind chill", "weather alert", "first alert", "storm damage",
            "power outages",
        ],
    ),
    (
        Category::Schools,
        &[
            "school board", "board of education", "school district", "public schools",
            "superintendent", "elementary school", "middle school", "high school students",
            "school year", "department of education", "teachers and staff", "back to school",
        ],
    ),
    (
        Category::Sports,
        &[
            "basketball", "football", "baseball", "softball", "volleyball", "head coach",
            "state tournament", "regional tournament", "sweet sixteen", "playoff game",
            "final four", "touchdown", "wildcats", "state championship",
        ],
    ),
    (
        Category::Crime,
        &[
            "arrested", "charged with", "police said", "sheriff's office", "sheriff’s office",
            "state police", "indicted", "murder", "homicide", "shooting", "pleaded guilty",
            "sentenced to", "booked into", "search warrant",
        ],
    ),
    (
        Category::Government,
        &[
            "city council", "fiscal court", "county judge-executive", "general assembly",
            "governor", "legislature", "lawmakers", "ordinance", "house bill", "senate bill",
            "state senator", "state representative", "mayor", "election",
        ],
    ),
    (
        Category::Health,
        &[
            "health department", "public health", "hospital", "mental health", "overdose",
            "vaccine", "medicaid", "measles", "covid", "health care",
        ],
    ),
    (
        Category::Business,
        &[
            "ribbon cutting", "grand opening", "new jobs", "economic development",
            "unemployment rate", "chamber of commerce", "small business", "layoffs",
            "plans to open", "announced it will close",
        ],
    ),
];

static CATEGORY_PATTERNS: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    CATEGORY_PRIORITY
        .iter()
        .map(|(category, phrases)| {
            let alternation = phrases
                .iter()
                .map(|p| regex::escape(p).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            let regex = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap();
            (*category, regex)
        })
        .collect()
});

/// First category in priority order with a matching phrase.
pub fn topic_category(text: &str) -> Option<Category> {
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(category, _)| *category)
}

fn residual_category(state_relevant: bool) -> Category {
    if state_relevant {
        Category::StateGeneral
    } else {
        Category::National
    }
}

fn classification_from(category: Category, geo: &GeoResult, regions: Vec<String>, state: bool) -> Classification {
    Classification {
        category,
        is_state: state,
        is_national: !state,
        primary_region: regions.first().cloned(),
        regions,
        locality: geo.locality(),
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Never fails: every strategy ends on the heuristic path.
    async fn classify(&self, article: &ExtractedArticle) -> Classification;
}

/// Pattern and gazetteer classification. Deterministic.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    geo: GeoDetector,
}

impl HeuristicClassifier {
    pub fn new(geo: GeoDetector) -> Self {
        Self { geo }
    }

    /// Geo detection over the title and lead together.
    pub fn detect_geo(&self, title: &str, lead: &str) -> GeoResult {
        self.geo.detect(&format!("{title}\n{lead}"))
    }

    pub fn classify_text(&self, title: &str, lead: &str) -> (Classification, GeoResult) {
        let geo = self.detect_geo(title, lead);
        let state = geo.is_state_relevant();
        let category = topic_category(&format!("{title}\n{lead}")).unwrap_or(residual_category(state));
        let classification = classification_from(category, &geo, geo.regions(), state);
        (classification, geo)
    }
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    async fn classify(&self, article: &ExtractedArticle) -> Classification {
        self.classify_text(&article.title, &article.classification_lead).0
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelVerdict {
    category: String,
    #[serde(default)]
    state_relevant: bool,
    #[serde(default)]
    counties: Vec<String>,
}

/// A model verdict that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedVerdict {
    pub category: Category,
    pub state_relevant: bool,
    /// Gazetteer spellings.
    pub counties: Vec<String>,
}

/// Parse and validate a model reply. Any unknown category or county rejects
/// the whole verdict.
///
/// A reply cut off mid-object is a [`IngestError::Parse`] so callers can
/// re-ask; every other problem is a [`IngestError::Validation`].
pub fn parse_verdict(reply: &str) -> Result<ValidatedVerdict> {
    let start = reply
        .find('{')
        .ok_or_else(|| IngestError::Validation("model reply has no JSON object".into()))?;
    let json = extract_json_object(reply).unwrap_or(&reply[start..]);
    let raw: ModelVerdict = serde_json::from_str(json).map_err(|e| {
        if looks_truncated(&e) {
            IngestError::Parse(format!("truncated verdict JSON: {e}"))
        } else {
            IngestError::Validation(format!("bad verdict JSON: {e}"))
        }
    })?;
    let category = raw
        .category
        .parse::<Category>()
        .map_err(IngestError::Validation)?;
    let counties = raw
        .counties
        .iter()
        .map(|name| {
            county_name(name).ok_or_else(|| IngestError::Validation(format!("unknown county {name:?}")))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unique()
        .map(str::to_string)
        .collect();
    Ok(ValidatedVerdict {
        category,
        state_relevant: raw.state_relevant,
        counties,
    })
}

fn classification_prompt(title: &str, lead: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You classify local news for a Kentucky news service.\n\
         Reply with only a JSON object of the form \
         {{\"category\": string, \"stateRelevant\": boolean, \"counties\": [string]}}.\n\
         category must be one of: {categories}.\n\
         counties lists Kentucky counties the story is about, without the word \"County\".\n\n\
         Title: {title}\n\nText: {lead}\n"
    )
}

/// Model-augmented classification.
pub struct ModelClassifier {
    model: Arc<dyn TextModel>,
    heuristic: HeuristicClassifier,
}

impl ModelClassifier {
    pub fn new(model: Arc<dyn TextModel>, heuristic: HeuristicClassifier) -> Self {
        Self { model, heuristic }
    }

    async fn ask_verdict(&self, prompt: &str) -> Result<ValidatedVerdict> {
        let reply = self.model.ask(prompt).await?;
        parse_verdict(&reply)
    }

    /// Heuristic regions win when present; a residual category is re-derived
    /// so it agrees with the merged state flag.
    fn merge(heuristic: Classification, geo: &GeoResult, verdict: ValidatedVerdict) -> Classification {
        let regions = if heuristic.regions.is_empty() {
            verdict.counties
        } else {
            heuristic.regions
        };
        let state = heuristic.is_state || verdict.state_relevant || !regions.is_empty();
        let category = match verdict.category {
            Category::StateGeneral | Category::National => residual_category(state),
            other => other,
        };
        classification_from(category, geo, regions, state)
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&article.title, 80)))]
    async fn classify(&self, article: &ExtractedArticle) -> Classification {
        let (heuristic, geo) = self
            .heuristic
            .classify_text(&article.title, &article.classification_lead);
        let lead: String = article.classification_lead.chars().take(MODEL_LEAD_CHARS).collect();
        let prompt = classification_prompt(&article.title, &lead);

        let mut verdict = self.ask_verdict(&prompt).await;
        if let Err(IngestError::Parse(e)) = &verdict {
            warn!(error = %e, "Verdict truncated; re-asking once");
            verdict = self.ask_verdict(&prompt).await;
        }
        match verdict {
            Ok(verdict) => {
                debug!(category = verdict.category.as_str(), counties = verdict.counties.len(), "Model verdict accepted");
                Self::merge(heuristic, &geo, verdict)
            }
            Err(e) => {
                warn!(error = %e, "Model classification discarded; using heuristic");
                heuristic
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use chrono::Utc;

    fn article(title: &str, lead: &str) -> ExtractedArticle {
        ExtractedArticle {
            canonical_url: "https://example.com/news/story".into(),
            source_url: "https://example.com".into(),
            title: title.into(),
            author: None,
            published_at: Utc::now(),
            content_text: lead.into(),
            content_html: String::new(),
            classification_lead: lead.into(),
            image_url: None,
        }
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            topic_category("Former coach passed away; visitation will be Friday at the funeral home"),
            Some(Category::Obituaries)
        );
        assert_eq!(
            topic_category("Tornado warning issued as basketball game is postponed"),
            Some(Category::Weather)
        );
        assert_eq!(topic_category("School board approves football stadium lights"), Some(Category::Schools));
        assert_eq!(topic_category("Man arrested after shooting outside bar"), Some(Category::Crime));
    }

    #[test]
    fn test_compound_phrases_only() {
        // A bare "school" or "storm" is not enough.
        assert_eq!(topic_category("The old school building hosts a storm of shoppers"), None);
    }

    #[tokio::test]
    async fn test_heuristic_residual_categories() {
        let classifier = HeuristicClassifier::default();
        let c = classifier
            .classify(&article("Perry County library expands hours", "The library in Hazard will open on Sundays."))
            .await;
        assert_eq!(c.category, Category::StateGeneral);
        assert!(c.is_state);
        assert_eq!(c.primary_region.as_deref(), Some("Perry"));

        let c = classifier
            .classify(&article("Markets rally on trade news", "Stocks rose sharply on Wall Street."))
            .await;
        assert_eq!(c.category, Category::National);
        assert!(c.is_national);
        assert!(c.regions.is_empty());
    }

    #[test]
    fn test_parse_verdict_validates() {
        let ok = parse_verdict(r#"{"category":"crime","stateRelevant":true,"counties":["Pike County","pike"]}"#).unwrap();
        assert_eq!(ok.category, Category::Crime);
        assert_eq!(ok.counties, vec!["Pike"]);
        assert!(parse_verdict(r#"{"category":"celebrity","stateRelevant":true}"#).is_err());
        assert!(parse_verdict(r#"{"category":"crime","counties":["Cook"]}"#).is_err());
        assert!(parse_verdict("I think it is crime news").is_err());
    }

    #[tokio::test]
    async fn test_model_verdict_merged() {
        let model = Arc::new(MockModel::replying(
            r#"```json
{"category": "health", "stateRelevant": true, "counties": ["Floyd"]}
```"#,
        ));
        let classifier = ModelClassifier::new(model.clone(), HeuristicClassifier::default());
        let c = classifier
            .classify(&article("Clinic adds hours", "A regional clinic will stay open later on weekdays."))
            .await;
        assert_eq!(model.calls(), 1);
        assert_eq!(c.category, Category::Health);
        assert_eq!(c.regions, vec!["Floyd"]);
        assert!(c.is_state);
    }

    #[tokio::test]
    async fn test_invalid_model_reply_falls_back() {
        let model = Arc::new(MockModel::replying(r#"{"category": "lifestyle", "stateRelevant": false}"#));
        let classifier = ModelClassifier::new(model, HeuristicClassifier::default());
        let a = article("Fiscal court approves road budget", "The Pike County fiscal court met Monday in Pikeville.");
        let expected = HeuristicClassifier::default().classify(&a).await;
        assert_eq!(classifier.classify(&a).await, expected);
        assert_eq!(expected.category, Category::Government);
    }

    #[tokio::test]
    async fn test_truncated_reply_reasked_once() {
        let model = Arc::new(MockModel::replying(r#"{"category": "crime", "counties": ["Pi"#));
        let classifier = ModelClassifier::new(model.clone(), HeuristicClassifier::default());
        let c = classifier.classify(&article("Markets rally", "Stocks rose.")).await;
        assert_eq!(model.calls(), 2);
        assert_eq!(c.category, Category::National);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let model = Arc::new(MockModel::failing_then(10, "unused"));
        let classifier = ModelClassifier::new(model, HeuristicClassifier::default());
        let c = classifier.classify(&article("Markets rally", "Stocks rose.")).await;
        assert_eq!(c.category, Category::National);
    }
}
