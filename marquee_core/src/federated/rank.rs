//! Composite scoring and ordering of canonical results.

use super::{CanonicalResult, Query, SourcePriorities};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Weights for the composite rank score.
///
/// Match score carries the highest weight; source priority and
/// corroboration (extra sources agreeing on a result) break near-ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub match_weight: f64,
    pub priority_weight: f64,
    pub corroboration_weight: f64,
    pub corroboration_cap: usize,
    pub year_bonus: f64,
    pub language_bonus: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            match_weight: 1.0,
            priority_weight: 0.15,
            corroboration_weight: 0.05,
            corroboration_cap: 3,
            year_bonus: 0.1,
            language_bonus: 0.05,
        }
    }
}

fn max_priority(result: &CanonicalResult, priorities: &SourcePriorities) -> f32 {
    result
        .sources
        .iter()
        .map(|s| priorities.priority_for(&s.source))
        .fold(f32::MIN, f32::max)
}

/// Composite score for one result.
pub fn composite_score(
    result: &CanonicalResult,
    weights: &RankWeights,
    priorities: &SourcePriorities,
    query: &Query,
) -> f64 {
    let extra_sources = result.sources.len().saturating_sub(1);
    let corroboration = extra_sources.min(weights.corroboration_cap) as f64;

    let mut score = weights.match_weight * result.match_score
        + weights.priority_weight * f64::from(max_priority(result, priorities))
        + weights.corroboration_weight * corroboration;

    if query.year.is_some() && query.year == result.year {
        score += weights.year_bonus;
    }
    if query.language.is_some_and(|lang| lang.is_known() && lang == result.language) {
        score += weights.language_bonus;
    }
    score
}

/// Score, sort and truncate results to `result_budget`.
///
/// Ties fall back to match score, then attribution count, then source
/// priority, then discovery order, so the output is fully deterministic.
pub fn rank(
    mut results: Vec<CanonicalResult>,
    result_budget: usize,
    weights: &RankWeights,
    priorities: &SourcePriorities,
    query: &Query,
) -> Vec<CanonicalResult> {
    if result_budget == 0 {
        return Vec::new();
    }

    for result in &mut results {
        result.rank_score = composite_score(result, weights, priorities, query);
    }

    results.sort_by(|a, b| compare(a, b, priorities));
    results.truncate(result_budget);
    results
}

fn compare(a: &CanonicalResult, b: &CanonicalResult, priorities: &SourcePriorities) -> Ordering {
    b.rank_score
        .total_cmp(&a.rank_score)
        .then_with(|| b.match_score.total_cmp(&a.match_score))
        .then_with(|| b.sources.len().cmp(&a.sources.len()))
        .then_with(|| max_priority(b, priorities).total_cmp(&max_priority(a, priorities)))
        .then_with(|| a.discovery_index.cmp(&b.discovery_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federated::{Language, Quality, SourceAttribution};
    use serde_json::Map;

    fn rank_plain(results: Vec<CanonicalResult>, budget: usize) -> Vec<CanonicalResult> {
        rank(results, budget, &RankWeights::default(), &SourcePriorities::new(), &Query::new("x"))
    }

    fn result(
        title: &str,
        match_score: f64,
        sources: &[&str],
        discovery_index: usize,
    ) -> CanonicalResult {
        CanonicalResult {
            title: title.to_string(),
            year: None,
            quality: Quality::Unknown,
            language: Language::Unknown,
            match_score,
            sources: sources
                .iter()
                .map(|s| SourceAttribution {
                    source: s.to_string(),
                    page_ref: format!("https://{}/{}", s, title),
                    extra: Map::new(),
                })
                .collect(),
            rank_score: 0.0,
            discovery_index,
        }
    }

    fn titles(results: &[CanonicalResult]) -> Vec<&str> {
        results.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_match_score_dominates() {
        let results = vec![
            result("weak", 0.4, &["a", "b", "c", "d"], 0),
            result("strong", 0.95, &["a"], 1),
        ];
        let ranked = rank_plain(results, 10);
        assert_eq!(titles(&ranked), vec!["strong", "weak"]);
        assert!(ranked[0].rank_score > ranked[1].rank_score);
    }

    #[test]
    fn test_priority_breaks_near_ties() {
        let priorities = SourcePriorities::new().with("trusted", 2.0);
        let results = vec![
            result("plain", 0.9, &["random"], 0),
            result("preferred", 0.9, &["trusted"], 1),
        ];
        let ranked = rank(results, 10, &RankWeights::default(), &priorities, &Query::new("x"));
        assert_eq!(titles(&ranked), vec!["preferred", "plain"]);
    }

    #[test]
    fn test_corroboration_is_capped() {
        let weights = RankWeights::default();
        let q = Query::new("x");
        let p = SourcePriorities::new();
        let four = composite_score(&result("t", 0.5, &["a", "b", "c", "d"], 0), &weights, &p, &q);
        let eight = composite_score(
            &result("t", 0.5, &["a", "b", "c", "d", "e", "f", "g", "h"], 0),
            &weights,
            &p,
            &q,
        );
        assert_eq!(four, eight);
    }

    #[test]
    fn test_year_and_language_bonus() {
        let mut matching = result("Leo", 0.8, &["a"], 1);
        matching.year = Some(2023);
        matching.language = Language::Tamil;
        let other = result("Leo", 0.8, &["a"], 0);

        let q = Query::new("Leo").with_year(2023).with_language(Language::Tamil);
        let weights = RankWeights::default();
        let ranked = rank(vec![other, matching], 10, &weights, &SourcePriorities::new(), &q);
        assert_eq!(ranked[0].year, Some(2023));
        assert!((ranked[0].rank_score - ranked[1].rank_score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_full_tie_falls_back_to_discovery_order() {
        let results = vec![
            result("third", 0.7, &["a"], 2),
            result("first", 0.7, &["a"], 0),
            result("second", 0.7, &["a"], 1),
        ];
        let ranked = rank_plain(results, 10);
        assert_eq!(titles(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_budget_truncates() {
        let results = (0..5).map(|i| result(&format!("r{}", i), 0.5, &["a"], i)).collect();
        let ranked = rank_plain(results, 2);
        assert_eq!(ranked.len(), 2);

        let none = rank(
            vec![result("r", 1.0, &["a"], 0)],
            0,
            &RankWeights::default(),
            &SourcePriorities::new(),
            &Query::new("x"),
        );
        assert!(none.is_empty());
    }
}
