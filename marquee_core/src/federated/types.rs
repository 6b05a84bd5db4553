//! Core types for federated search results.

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Default priority for sources without explicit configuration.
pub const DEFAULT_PRIORITY: f32 = 1.0;

/// Closed quality vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Quality {
    /// Map free text ("1080p WEB-DL", "Full HD", "4k") onto the vocabulary.
    ///
    /// The most specific token wins, so "HD 1080p" is 1080p rather than 720p.
    pub fn from_token(text: &str) -> Self {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |w: &str| words.contains(&w);

        if has("2160p") || has("4k") || has("uhd") {
            Quality::Uhd4k
        } else if has("1080p") || has("fhd") || has("fullhd") || lower.contains("full hd") {
            Quality::P1080
        } else if has("720p") || has("hd") || has("hdrip") {
            Quality::P720
        } else if has("480p") || has("360p") || has("sd") || has("dvdrip") || has("cam") {
            Quality::P480
        } else {
            Quality::Unknown
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Quality::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Uhd4k => "4K",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed language vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Hindi,
    English,
    Tamil,
    Telugu,
    Malayalam,
    Kannada,
    Bengali,
    Punjabi,
    Marathi,
    Gujarati,
    #[default]
    Unknown,
}

const LANGUAGES: &[(&str, Language)] = &[
    ("hindi", Language::Hindi),
    ("english", Language::English),
    ("tamil", Language::Tamil),
    ("telugu", Language::Telugu),
    ("malayalam", Language::Malayalam),
    ("kannada", Language::Kannada),
    ("bengali", Language::Bengali),
    ("punjabi", Language::Punjabi),
    ("marathi", Language::Marathi),
    ("gujarati", Language::Gujarati),
];

impl Language {
    /// Map free text ("Hindi Dubbed", "TELUGU") onto the vocabulary.
    pub fn from_token(text: &str) -> Self {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !c.is_alphanumeric())
            .find_map(|word| {
                LANGUAGES
                    .iter()
                    .find(|(name, _)| *name == word)
                    .map(|(_, lang)| *lang)
            })
            .unwrap_or(Language::Unknown)
    }

    pub fn is_known(&self) -> bool {
        *self != Language::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        LANGUAGES
            .iter()
            .find(|(_, lang)| lang == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user query. Immutable once built; no identity beyond its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
}

impl Query {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            language: None,
            quality: None,
        }
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// One unverified result returned by a single source.
///
/// Metadata is kept as scraped text; the normalizer parses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Source identifier
    pub source: String,

    /// Title as scraped
    pub title: String,

    /// Opaque locator for the result page (usually a URL)
    pub page_ref: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Source-specific fields, passed through unmodified
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl RawCandidate {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        page_ref: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            page_ref: page_ref.into(),
            year: None,
            quality: None,
            language: None,
            extra: Map::new(),
        }
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A `(source, page reference)` pair backing a canonical result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub source: String,
    pub page_ref: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// The deduplicated, cross-source result surfaced to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResult {
    /// Display title (original casing)
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,

    pub quality: Quality,
    pub language: Language,

    /// Similarity of the display title to the query, in [0, 1]
    pub match_score: f64,

    /// Every source agreeing this is the same result. Never empty.
    pub sources: Vec<SourceAttribution>,

    /// Composite score assigned by the ranker
    #[serde(default)]
    pub rank_score: f64,

    /// Position of the earliest member in discovery order
    #[serde(default)]
    pub discovery_index: usize,
}

impl CanonicalResult {
    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for attribution in &self.sources {
            if !ids.contains(&attribution.source.as_str()) {
                ids.push(attribution.source.as_str());
            }
        }
        ids
    }
}

/// Per-source priority weights. Sources not listed get `DEFAULT_PRIORITY`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePriorities(HashMap<String, f32>);

impl SourcePriorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Into<String>, priority: f32) -> Self {
        self.0.insert(source.into(), priority);
        self
    }

    pub fn set(&mut self, source: impl Into<String>, priority: f32) {
        self.0.insert(source.into(), priority);
    }

    pub fn priority_for(&self, source: &str) -> f32 {
        self.0.get(source).copied().unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Candidates from a single source in a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResults {
    /// Source identifier
    pub source: String,

    pub candidates: Vec<RawCandidate>,

    /// Time taken to fetch results (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SourceResults {
    pub fn new(source: impl Into<String>, candidates: Vec<RawCandidate>) -> Self {
        Self {
            source: source.into(),
            candidates,
            duration_ms: None,
        }
    }
}

/// Everything a dispatch collected before its deadline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Successful sources, in adapter order
    pub results: Vec<SourceResults>,

    /// Failed sources, in adapter order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SourceError>,
}

impl DispatchOutcome {
    pub fn results_for(&self, source: &str) -> Option<&SourceResults> {
        self.results.iter().find(|r| r.source == source)
    }

    pub fn error_for(&self, source: &str) -> Option<&SourceError> {
        self.errors.iter().find(|e| e.source_id == source)
    }

    pub fn candidate_count(&self) -> usize {
        self.results.iter().map(|r| r.candidates.len()).sum()
    }

    /// Some sources failed.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Every source failed.
    pub fn all_failed(&self) -> bool {
        self.results.is_empty() && !self.errors.is_empty()
    }
}

/// Complete results from a federated search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: Query,

    /// Ranked, deduplicated results
    pub results: Vec<CanonicalResult>,

    /// Sources that completed successfully
    pub completed: Vec<String>,

    /// Sources that failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SourceError>,

    /// Whether results are partial (some sources failed/timed out)
    #[serde(default)]
    pub partial: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SearchResponse {
    /// Every queried source failed; distinct from "nothing matched".
    pub fn all_failed(&self) -> bool {
        self.completed.is_empty() && !self.errors.is_empty()
    }

    /// Sources answered but nothing matched.
    pub fn no_matches(&self) -> bool {
        self.results.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quality_from_token() {
        assert_eq!(Quality::from_token("1080p WEB-DL"), Quality::P1080);
        assert_eq!(Quality::from_token("Full HD"), Quality::P1080);
        assert_eq!(Quality::from_token("4K HDR"), Quality::Uhd4k);
        assert_eq!(Quality::from_token("HD 1080p"), Quality::P1080);
        assert_eq!(Quality::from_token("hdrip"), Quality::P720);
        assert_eq!(Quality::from_token("360p"), Quality::P480);
        assert_eq!(Quality::from_token("??"), Quality::Unknown);
        assert_eq!(Quality::from_token(""), Quality::Unknown);
    }

    #[test]
    fn test_language_from_token() {
        assert_eq!(Language::from_token("Hindi Dubbed"), Language::Hindi);
        assert_eq!(Language::from_token("TELUGU"), Language::Telugu);
        assert_eq!(Language::from_token("Dual Audio"), Language::Unknown);
        assert_eq!(Language::Tamil.to_string(), "tamil");
    }

    #[test]
    fn test_quality_serialization() {
        assert_eq!(serde_json::to_value(Quality::Uhd4k).unwrap(), json!("4K"));
        let parsed: Quality = serde_json::from_value(json!("720p")).unwrap();
        assert_eq!(parsed, Quality::P720);
    }

    #[test]
    fn test_source_priorities_default() {
        let priorities = SourcePriorities::new().with("telegram", 2.0);
        assert_eq!(priorities.priority_for("telegram"), 2.0);
        assert_eq!(priorities.priority_for("moviezwap"), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_dispatch_outcome_failure_states() {
        let mut outcome = DispatchOutcome::default();
        assert!(!outcome.all_failed());

        outcome
            .errors
            .push(SourceError::failure("movierulz", "HTTP 500"));
        assert!(outcome.all_failed());

        outcome.results.push(SourceResults::new(
            "skysetx",
            vec![RawCandidate::new("skysetx", "Jawan", "https://skysetx.rip/jawan")],
        ));
        assert!(!outcome.all_failed());
        assert!(outcome.is_partial());
        assert_eq!(outcome.candidate_count(), 1);
        assert!(outcome.results_for("skysetx").is_some());
        assert!(outcome.error_for("movierulz").is_some());
    }

    #[test]
    fn test_raw_candidate_extra_passthrough() {
        let candidate = RawCandidate::new("telegram", "Leo", "telegram://message/42")
            .with_extra("telegram_message_id", json!(42));
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["extra"]["telegram_message_id"], 42);
    }
}
