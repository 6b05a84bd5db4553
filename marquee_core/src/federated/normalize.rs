//! Candidate normalization and cross-source deduplication.

use super::{
    CanonicalResult, Language, Quality, Query, RawCandidate, SourceAttribution, SourcePriorities,
    SourceResults,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Minimum folded-title similarity for two candidates to be the same result.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

const EARLIEST_YEAR: u16 = 1888;
const LATEST_YEAR: u16 = 2100;

static YEAR_IN_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20[0-3]\d)\b").expect("valid year regex"));

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[\{][^\)\]\}]*[\)\]\}]").expect("valid bracket regex"));

static TRAILING_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*(the|a|an)\s*$").expect("valid article regex"));

/// Release-name noise that says nothing about which film this is.
const NOISE_WORDS: &[&str] = &[
    "2160p", "1080p", "720p", "480p", "360p", "4k", "uhd", "fhd", "hd", "sd", "hdrip", "webrip",
    "web", "dl", "webdl", "bluray", "brrip", "dvdrip", "dvdscr", "hdtv", "cam", "camrip", "x264",
    "x265", "hevc", "aac", "mkv", "mp4", "avi", "hindi", "english", "tamil", "telugu",
    "malayalam", "kannada", "bengali", "punjabi", "marathi", "gujarati", "dubbed", "dual",
    "audio", "esub", "esubs", "movie", "full",
];

const ARTICLES: &[&str] = &["the", "a", "an"];

/// Similarity of two titles in [0, 1] after folding.
///
/// Pure and deterministic: the same inputs always give the same score.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&fold_title(a), &fold_title(b))
}

/// Comparison form of a title. Never used for display.
pub fn fold_title(title: &str) -> String {
    let lower = title.trim().to_lowercase();
    let without_brackets = BRACKETED.replace_all(&lower, " ");
    let without_article = TRAILING_ARTICLE.replace(without_brackets.trim_end(), "");

    let cleaned: String = without_article
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let all: Vec<&str> = cleaned.split_whitespace().collect();
    let mut words: Vec<&str> = all
        .iter()
        .copied()
        .filter(|w| !NOISE_WORDS.contains(w))
        .filter(|w| !YEAR_IN_TITLE.is_match(w))
        .collect();
    // Titles like "1917" are nothing but a year.
    if words.is_empty() {
        words = all;
    }

    if words.len() > 1 && ARTICLES.contains(&words[0]) {
        words.remove(0);
    }

    words.join(" ")
}

/// Display form of a scraped title: entities decoded, whitespace collapsed.
pub fn clean_title(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a year from a metadata field, falling back to the title.
pub fn parse_year(field: Option<&str>, title: &str) -> Option<u16> {
    field
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .filter(|year| (EARLIEST_YEAR..=LATEST_YEAR).contains(year))
        .or_else(|| {
            YEAR_IN_TITLE
                .captures(title)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
}

/// A candidate after per-item normalization.
#[derive(Debug, Clone)]
struct Normalized {
    candidate: RawCandidate,
    display_title: String,
    folded: String,
    year: Option<u16>,
    quality: Quality,
    language: Language,
    match_score: f64,
    discovery_index: usize,
}

fn normalize_one(
    candidate: RawCandidate,
    query_folded: &str,
    discovery_index: usize,
) -> Option<Normalized> {
    let display_title = clean_title(&candidate.title);
    if display_title.is_empty() {
        return None;
    }

    let folded = fold_title(&display_title);
    let year = parse_year(candidate.year.as_deref(), &display_title);

    let quality = candidate
        .quality
        .as_deref()
        .map(Quality::from_token)
        .filter(Quality::is_known)
        .unwrap_or_else(|| Quality::from_token(&display_title));

    let language = candidate
        .language
        .as_deref()
        .map(Language::from_token)
        .filter(Language::is_known)
        .unwrap_or_else(|| Language::from_token(&display_title));

    let match_score = strsim::normalized_levenshtein(&folded, query_folded);

    Some(Normalized {
        candidate,
        display_title,
        folded,
        year,
        quality,
        language,
        match_score,
        discovery_index,
    })
}

fn same_result(a: &Normalized, b: &Normalized) -> bool {
    let years_agree = match (a.year, b.year) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    };
    years_agree && strsim::normalized_levenshtein(&a.folded, &b.folded) >= SIMILARITY_THRESHOLD
}

/// Disjoint-set forest with path halving and union by size.
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

/// Merge per-source candidates into canonical results.
///
/// Output is ordered by each group's earliest discovery index. Running this
/// twice over the same input yields identical groupings and scores.
pub fn normalize(
    raw_by_source: &[SourceResults],
    query: &Query,
    priorities: &SourcePriorities,
) -> Vec<CanonicalResult> {
    let query_folded = fold_title(&query.title);

    let mut seen_refs: HashSet<(&str, &str)> = HashSet::new();
    let mut items: Vec<Normalized> = Vec::new();
    let mut discovery_index = 0usize;

    for batch in raw_by_source {
        for candidate in &batch.candidates {
            let index = discovery_index;
            discovery_index += 1;

            // Blank titles are dropped before they can claim a page reference.
            let mut owned = candidate.clone();
            owned.source = batch.source.clone();
            let Some(item) = normalize_one(owned, &query_folded, index) else {
                continue;
            };
            if seen_refs.insert((batch.source.as_str(), candidate.page_ref.as_str())) {
                items.push(item);
            }
        }
    }

    let mut sets = UnionFind::new(items.len());
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if same_result(&items[i], &items[j]) {
                sets.union(i, j);
            }
        }
    }

    // Group members keep discovery order; groups are keyed by first member.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: Vec<Option<usize>> = vec![None; items.len()];
    for i in 0..items.len() {
        let root = sets.find(i);
        match group_of_root[root] {
            Some(g) => groups[g].push(i),
            None => {
                group_of_root[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }

    groups
        .iter()
        .map(|members| merge_group(&items, members, priorities))
        .collect()
}

fn merge_group(
    items: &[Normalized],
    members: &[usize],
    priorities: &SourcePriorities,
) -> CanonicalResult {
    let best = members
        .iter()
        .copied()
        .reduce(|best, idx| {
            if items[idx].match_score > items[best].match_score {
                idx
            } else {
                best
            }
        })
        .unwrap_or(members[0]);

    // Metadata comes from the most trusted source first.
    let mut by_priority: Vec<usize> = members.to_vec();
    by_priority.sort_by(|&a, &b| {
        let pa = priorities.priority_for(&items[a].candidate.source);
        let pb = priorities.priority_for(&items[b].candidate.source);
        pb.total_cmp(&pa)
            .then(items[a].discovery_index.cmp(&items[b].discovery_index))
    });

    let year = by_priority.iter().find_map(|&i| items[i].year);
    let quality = by_priority
        .iter()
        .map(|&i| items[i].quality)
        .find(Quality::is_known)
        .unwrap_or_default();
    let language = by_priority
        .iter()
        .map(|&i| items[i].language)
        .find(Language::is_known)
        .unwrap_or_default();

    let mut sources: Vec<SourceAttribution> = Vec::with_capacity(members.len());
    for &i in members {
        let candidate = &items[i].candidate;
        let duplicate = sources
            .iter()
            .any(|s| s.source == candidate.source && s.page_ref == candidate.page_ref);
        if !duplicate {
            sources.push(SourceAttribution {
                source: candidate.source.clone(),
                page_ref: candidate.page_ref.clone(),
                extra: candidate.extra.clone(),
            });
        }
    }

    CanonicalResult {
        title: items[best].display_title.clone(),
        year,
        quality,
        language,
        match_score: items[best].match_score,
        sources,
        rank_score: 0.0,
        discovery_index: items[members[0]].discovery_index,
    }
}

/// Drop results whose known metadata contradicts the query filters.
///
/// Unknown values pass: scraped listings rarely carry full metadata.
pub fn apply_filters(results: Vec<CanonicalResult>, query: &Query) -> Vec<CanonicalResult> {
    results
        .into_iter()
        .filter(|r| match (query.year, r.year) {
            (Some(want), Some(have)) => want == have,
            _ => true,
        })
        .filter(|r| match query.quality {
            Some(want) if want.is_known() && r.quality.is_known() => want == r.quality,
            _ => true,
        })
        .filter(|r| match query.language {
            Some(want) if want.is_known() && r.language.is_known() => want == r.language,
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(source: &str, candidates: Vec<RawCandidate>) -> SourceResults {
        SourceResults::new(source, candidates)
    }

    #[test]
    fn test_fold_title() {
        assert_eq!(fold_title("The Matrix (1999)"), "matrix");
        assert_eq!(fold_title("Matrix, The"), "matrix");
        assert_eq!(fold_title("  Jawan 2023 Hindi 1080p WEB-DL  "), "jawan");
        assert_eq!(fold_title("Spider-Man: No Way Home"), "spider man no way home");
        assert_eq!(fold_title("A"), "a");
        assert_eq!(fold_title(""), "");
    }

    #[test]
    fn test_similarity_is_deterministic_and_bounded() {
        let a = similarity("The Matrix", "Matrix Reloaded");
        let b = similarity("The Matrix", "Matrix Reloaded");
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a));
        assert_eq!(similarity("Leo (2023)", "LEO"), 1.0);
        assert!(similarity("The Matrix", "Matrix Reloaded") < SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(Some("1999"), "x"), Some(1999));
        assert_eq!(parse_year(Some(" 2023 "), "x"), Some(2023));
        assert_eq!(parse_year(Some("n/a"), "Jawan (2023)"), Some(2023));
        assert_eq!(parse_year(Some("99999"), "Jawan"), None);
        assert_eq!(parse_year(None, "Blade Runner 2049"), None);
        assert_eq!(parse_year(None, "Jawan 2023 Hindi"), Some(2023));
    }

    #[test]
    fn test_matrix_grouping() {
        let input = vec![
            batch(
                "a",
                vec![RawCandidate::new("a", "The Matrix (1999)", "https://a/matrix")],
            ),
            batch(
                "b",
                vec![RawCandidate::new("b", "Matrix, The", "https://b/matrix").with_year("1999")],
            ),
            batch(
                "c",
                vec![RawCandidate::new("c", "Matrix Reloaded", "https://c/reloaded").with_year("2003")],
            ),
        ];

        let results = normalize(&input, &Query::new("The Matrix"), &SourcePriorities::new());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_ids(), vec!["a", "b"]);
        assert_eq!(results[0].year, Some(1999));
        assert_eq!(results[1].source_ids(), vec!["c"]);
        assert_eq!(results[1].year, Some(2003));
    }

    #[test]
    fn test_year_mismatch_prevents_merge() {
        let input = vec![
            batch("a", vec![RawCandidate::new("a", "Don (1978)", "https://a/1")]),
            batch("b", vec![RawCandidate::new("b", "Don (2006)", "https://b/1")]),
            batch("c", vec![RawCandidate::new("c", "Don", "https://c/1")]),
        ];
        let results = normalize(&input, &Query::new("Don"), &SourcePriorities::new());
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_transitive_merge() {
        let (a, b, c) = ("Drishyam", "Drishyan", "Drishyon");
        assert!(similarity(a, b) >= SIMILARITY_THRESHOLD);
        assert!(similarity(b, c) >= SIMILARITY_THRESHOLD);
        assert!(similarity(a, c) < SIMILARITY_THRESHOLD);

        let input = vec![
            batch("s1", vec![RawCandidate::new("s1", a, "p1")]),
            batch("s2", vec![RawCandidate::new("s2", c, "p2")]),
            batch("s3", vec![RawCandidate::new("s3", b, "p3")]),
        ];
        let results = normalize(&input, &Query::new(a), &SourcePriorities::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sources.len(), 3);
        assert_eq!(results[0].title, a);
    }

    #[test]
    fn test_clean_title_and_year_only_titles() {
        assert_eq!(clean_title("  Tom &amp; Jerry\n "), "Tom & Jerry");
        assert_eq!(fold_title("1917 (2019)"), "1917");
    }

    #[test]
    fn test_empty_titles_and_duplicate_refs_dropped() {
        let input = vec![batch(
            "moviezwap",
            vec![
                RawCandidate::new("moviezwap", "   ", "https://m/blank"),
                RawCandidate::new("moviezwap", "Pushpa 2", "https://m/pushpa"),
                RawCandidate::new("moviezwap", "Pushpa 2 (Telugu)", "https://m/pushpa"),
            ],
        )];
        let results = normalize(&input, &Query::new("Pushpa 2"), &SourcePriorities::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sources.len(), 1);
        assert_eq!(results[0].title, "Pushpa 2");
    }

    #[test]
    fn test_blank_title_does_not_claim_page_ref() {
        let input = vec![batch(
            "moviezwap",
            vec![
                RawCandidate::new("moviezwap", "   ", "https://m/pushpa"),
                RawCandidate::new("moviezwap", "Pushpa 2", "https://m/pushpa"),
            ],
        )];
        let results = normalize(&input, &Query::new("Pushpa 2"), &SourcePriorities::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Pushpa 2");
        assert_eq!(results[0].sources[0].page_ref, "https://m/pushpa");
        assert_eq!(results[0].discovery_index, 1);
    }

    #[test]
    fn test_metadata_follows_source_priority() {
        let input = vec![
            batch(
                "low",
                vec![RawCandidate::new("low", "Leo", "l").with_quality("720p").with_language("Tamil")],
            ),
            batch(
                "high",
                vec![RawCandidate::new("high", "Leo", "h").with_quality("1080p")],
            ),
        ];
        let priorities = SourcePriorities::new().with("high", 2.0);
        let results = normalize(&input, &Query::new("Leo"), &priorities);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].quality, Quality::P1080);
        assert_eq!(results[0].language, Language::Tamil);
        assert_eq!(results[0].discovery_index, 0);
    }

    #[test]
    fn test_malformed_metadata_degrades_to_unknown() {
        let input = vec![batch(
            "x",
            vec![RawCandidate::new("x", "Kalki", "k")
                .with_year("soon")
                .with_quality("???")
                .with_language("klingon")],
        )];
        let results = normalize(&input, &Query::new("Kalki"), &SourcePriorities::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].year, None);
        assert_eq!(results[0].quality, Quality::Unknown);
        assert_eq!(results[0].language, Language::Unknown);
    }

    #[test]
    fn test_display_title_is_best_match() {
        let input = vec![
            batch("a", vec![RawCandidate::new("a", "RRR 2022 Hindi Dubbed", "a1")]),
            batch("b", vec![RawCandidate::new("b", "RRR (2022)", "b1")]),
        ];
        let results = normalize(&input, &Query::new("RRR"), &SourcePriorities::new());
        assert_eq!(results.len(), 1);
        // Both fold to "rrr": a tie keeps the earliest discovered.
        assert_eq!(results[0].title, "RRR 2022 Hindi Dubbed");
        assert_eq!(results[0].match_score, 1.0);
        assert_eq!(results[0].language, Language::Hindi);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = vec![
            batch("a", vec![
                RawCandidate::new("a", "Animal (2023)", "a1"),
                RawCandidate::new("a", "Animal Park", "a2"),
            ]),
            batch("b", vec![RawCandidate::new("b", "Animal 2023 1080p", "b1")]),
        ];
        let q = Query::new("Animal");
        let first = normalize(&input, &q, &SourcePriorities::new());
        let second = normalize(&input, &q, &SourcePriorities::new());

        assert_eq!(first.len(), second.len());
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.title, y.title);
            assert_eq!(x.sources, y.sources);
            assert_eq!(x.match_score, y.match_score);
        }
    }

    #[test]
    fn test_apply_filters_keeps_unknowns() {
        let input = vec![
            batch("a", vec![RawCandidate::new("a", "Devara 2024 Telugu 1080p", "a1")]),
            batch("b", vec![RawCandidate::new("b", "Devara Part 1 Hindi 720p", "b1")]),
            batch("c", vec![RawCandidate::new("c", "Devara Special Edition", "c1")]),
        ];
        let q = Query::new("Devara").with_language(Language::Telugu);
        let normalized = normalize(&input, &q, &SourcePriorities::new());
        let filtered = apply_filters(normalized, &q);

        let titles: Vec<_> = filtered.iter().map(|r| r.title.as_str()).collect();
        assert!(titles.contains(&"Devara 2024 Telugu 1080p"));
        assert!(titles.contains(&"Devara Special Edition"));
        assert!(!titles.contains(&"Devara Part 1 Hindi 720p"));
    }
}
