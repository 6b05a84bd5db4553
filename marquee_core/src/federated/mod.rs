//! Federated movie search across independent sources.
//!
//! This module provides:
//! - `dispatch`: concurrent fan-out with per-source timeouts and a deadline
//! - `normalize`: fuzzy cross-source deduplication into `CanonicalResult`s
//! - `rank`: composite scoring and truncation
//! - `SearchEngine`: the above chained behind one call
//!
//! # Example
//!
//! ```ignore
//! use marquee_core::federated::{Query, SearchEngine, SearchOptions};
//!
//! let engine = SearchEngine::new(&registry);
//! let query = Query::new("Jawan").with_year(2023);
//! let response = engine.search(&query, &SearchOptions::default()).await?;
//! ```

pub mod dispatch;
mod engine;
pub mod normalize;
pub mod rank;
mod types;

pub use dispatch::dispatch;
pub use engine::{
    SearchEngine, SearchOptions, DEFAULT_OVERALL_DEADLINE_MS, DEFAULT_PER_SOURCE_TIMEOUT_MS,
    DEFAULT_RESULT_BUDGET,
};
pub use normalize::{apply_filters, normalize, similarity, SIMILARITY_THRESHOLD};
pub use rank::{rank, RankWeights};
pub use types::{
    CanonicalResult, DispatchOutcome, Language, Quality, Query, RawCandidate, SearchResponse,
    SourceAttribution, SourcePriorities, SourceResults, DEFAULT_PRIORITY,
};
