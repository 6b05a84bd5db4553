// src/lib.rs
pub mod config;
pub mod cpu_pool;
pub mod error;
pub mod federated;
pub mod health;
pub mod sources;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use crate::config::{ConfigStore, EngineConfig, SourceSettings};
pub use crate::error::{CoreError, ErrorKind, ProbeError, SourceError};
pub use crate::federated::{
    CanonicalResult, Language, Quality, Query, RawCandidate, SearchEngine, SearchOptions,
    SearchResponse,
};
pub use crate::health::{
    check_link_health, CheckedLink, HealthOptions, HealthStatus, HealthVerdict, HttpProber,
    LinkHealthEngine, LinkProber, ProbeResponse, RawLink,
};
pub use crate::sources::HttpJsonSource;

/// An independent backend that answers queries with candidate listings.
///
/// Implementations must honour cancellation promptly: the dispatcher drops
/// the future when a timeout or the overall deadline fires.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique source identifier (e.g. "moviezwap").
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>, SourceError>;
}

/// Turns a chosen result page into raw download links.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn extract(&self, page_ref: &str) -> Result<Vec<RawLink>, SourceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub description: String,
    pub has_extractor: bool,
}

struct RegisteredSource {
    adapter: Arc<dyn SourceAdapter>,
    extractor: Option<Arc<dyn LinkExtractor>>,
}

/// The runtime set of sources. Registration order is the discovery order
/// used by the dispatcher and the normalizer.
#[derive(Default)]
pub struct SourceRegistry {
    order: Vec<String>,
    sources: HashMap<String, RegisteredSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Re-registering an id replaces it in place.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.insert(adapter, None);
    }

    pub fn register_with_extractor(
        &mut self,
        adapter: Arc<dyn SourceAdapter>,
        extractor: Arc<dyn LinkExtractor>,
    ) {
        self.insert(adapter, Some(extractor));
    }

    fn insert(
        &mut self,
        adapter: Arc<dyn SourceAdapter>,
        extractor: Option<Arc<dyn LinkExtractor>>,
    ) {
        let id = adapter.id().to_string();
        if !self.sources.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.sources
            .insert(id, RegisteredSource { adapter, extractor });
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.sources.get(id).map(|s| &s.adapter)
    }

    pub fn extractor(&self, id: &str) -> Option<&Arc<dyn LinkExtractor>> {
        self.sources.get(id).and_then(|s| s.extractor.as_ref())
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn list(&self) -> Vec<SourceInfo> {
        self.order
            .iter()
            .filter_map(|id| {
                self.sources.get(id).map(|s| SourceInfo {
                    id: id.clone(),
                    description: s.adapter.description().to_string(),
                    has_extractor: s.extractor.is_some(),
                })
            })
            .collect()
    }

    /// Adapters to query, in registration order. `None` selects everything.
    pub fn select(&self, enabled: Option<&[String]>) -> Vec<Arc<dyn SourceAdapter>> {
        if let Some(enabled) = enabled {
            for id in enabled {
                if !self.sources.contains_key(id) {
                    warn!(target: "marquee.registry", source = %id, "ignoring unknown source");
                }
            }
        }

        self.order
            .iter()
            .filter(|id| enabled.map_or(true, |set| set.contains(*id)))
            .filter_map(|id| self.sources.get(id).map(|s| Arc::clone(&s.adapter)))
            .collect()
    }
}

/// Run a source's link extractor for a chosen result page.
///
/// Extractor failures and timeouts come back as a `SourceError`; only an
/// unregistered source or missing extractor is a `CoreError`.
pub async fn extract_links(
    registry: &SourceRegistry,
    source: &str,
    page_ref: &str,
    timeout: Duration,
) -> Result<Result<Vec<RawLink>, SourceError>, CoreError> {
    if timeout.is_zero() {
        return Err(CoreError::InvalidOptions(
            "extraction timeout must be positive".to_string(),
        ));
    }
    if registry.get(source).is_none() {
        return Err(CoreError::UnknownSource(source.to_string()));
    }
    let extractor = registry.extractor(source).ok_or_else(|| {
        CoreError::InvalidOptions(format!("source '{}' has no link extractor", source))
    })?;

    match tokio::time::timeout(timeout, extractor.extract(page_ref)).await {
        Ok(Ok(links)) => {
            debug!(target: "marquee.extract", source, count = links.len(), "links extracted");
            Ok(Ok(links))
        }
        Ok(Err(mut err)) => {
            warn!(target: "marquee.extract", source, error = %err, "link extraction failed");
            if err.kind == ErrorKind::SourceFailure {
                err.kind = ErrorKind::ExtractionFailure;
            }
            Ok(Err(err))
        }
        Err(_) => Ok(Err(SourceError::timeout(source, timeout.as_millis()))),
    }
}
