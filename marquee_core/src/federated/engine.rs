//! Federated search execution engine.
//!
//! Dispatches a query to the selected sources, then merges, filters and
//! ranks whatever came back before the deadline.

use super::dispatch::{dispatch, validate_timings};
use super::normalize::{apply_filters, normalize};
use super::rank::{rank, RankWeights};
use super::{Query, SearchResponse, SourcePriorities};
use crate::error::CoreError;
use crate::{cpu_pool, SourceRegistry};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default per-source timeout in milliseconds
pub const DEFAULT_PER_SOURCE_TIMEOUT_MS: u64 = 10_000;

/// Default overall deadline in milliseconds
pub const DEFAULT_OVERALL_DEADLINE_MS: u64 = 25_000;

/// Default number of ranked results returned
pub const DEFAULT_RESULT_BUDGET: usize = 20;

/// Per-call knobs for a federated search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub per_source_timeout: Duration,
    pub overall_deadline: Duration,
    pub result_budget: usize,
    /// Sources to query; `None` queries every registered source
    pub enabled_sources: Option<Vec<String>>,
    pub weights: RankWeights,
    pub priorities: SourcePriorities,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            per_source_timeout: Duration::from_millis(DEFAULT_PER_SOURCE_TIMEOUT_MS),
            overall_deadline: Duration::from_millis(DEFAULT_OVERALL_DEADLINE_MS),
            result_budget: DEFAULT_RESULT_BUDGET,
            enabled_sources: None,
            weights: RankWeights::default(),
            priorities: SourcePriorities::default(),
        }
    }
}

impl SearchOptions {
    pub fn with_timeouts(mut self, per_source: Duration, overall: Duration) -> Self {
        self.per_source_timeout = per_source;
        self.overall_deadline = overall;
        self
    }

    pub fn with_budget(mut self, result_budget: usize) -> Self {
        self.result_budget = result_budget;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.enabled_sources = Some(sources);
        self
    }

    pub fn with_priorities(mut self, priorities: SourcePriorities) -> Self {
        self.priorities = priorities;
        self
    }
}

/// Engine for executing federated searches across registered sources.
pub struct SearchEngine<'a> {
    registry: &'a SourceRegistry,
}

impl<'a> SearchEngine<'a> {
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Self { registry }
    }

    /// Run a search end to end.
    ///
    /// Only contract violations (bad timings, empty title) are errors.
    /// Source failures are reported in `SearchResponse::errors`.
    pub async fn search(
        &self,
        query: &Query,
        options: &SearchOptions,
    ) -> Result<SearchResponse, CoreError> {
        validate_timings(options.per_source_timeout, options.overall_deadline)?;
        if query.title.trim().is_empty() {
            return Err(CoreError::InvalidOptions(
                "query title must not be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let adapters = self.registry.select(options.enabled_sources.as_deref());
        info!(
            target: "marquee.search",
            title = %query.title,
            sources = adapters.len(),
            "starting federated search"
        );

        let outcome = dispatch(
            query,
            &adapters,
            options.per_source_timeout,
            options.overall_deadline,
        )
        .await?;

        let completed: Vec<String> = outcome.results.iter().map(|r| r.source.clone()).collect();
        let partial = outcome.is_partial();
        let errors = outcome.errors;
        let batches = outcome.results;

        let normalized = {
            let query = query.clone();
            let priorities = options.priorities.clone();
            cpu_pool::spawn_cpu(move || normalize(&batches, &query, &priorities)).await?
        };
        let grouped = normalized.len();

        let filtered = apply_filters(normalized, query);
        let results = rank(
            filtered,
            options.result_budget,
            &options.weights,
            &options.priorities,
            query,
        );

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            target: "marquee.search",
            grouped,
            returned = results.len(),
            failed = errors.len(),
            duration_ms,
            "federated search finished"
        );

        Ok(SearchResponse {
            query: query.clone(),
            results,
            completed,
            errors,
            partial,
            duration_ms: Some(duration_ms),
        })
    }
}
