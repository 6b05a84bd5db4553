//! Link health checking.
//!
//! Extracted download links are probed concurrently, classified into a
//! closed set of verdicts and reordered so that healthy links on trusted
//! hosts come first.

pub mod classify;
mod engine;
pub mod probe;
mod types;

use crate::error::CoreError;
use std::sync::Arc;

pub use classify::classify;
pub use engine::LinkHealthEngine;
pub use probe::{HttpProber, LinkProber, ProbeResponse, MAX_BODY_BYTES};
pub use types::{
    CheckedLink, HealthOptions, HealthStatus, HealthVerdict, RawLink, DEFAULT_CONCURRENCY_LIMIT,
    DEFAULT_PER_LINK_TIMEOUT_MS, DEFAULT_SLOW_THRESHOLD_MS, DEFAULT_TRUSTED_HOSTS,
};

pub(crate) use types::url_host;

/// Check links over HTTP with the default transport.
pub async fn check_link_health(
    links: Vec<RawLink>,
    options: &HealthOptions,
) -> Result<Vec<CheckedLink>, CoreError> {
    let prober = HttpProber::new()?;
    LinkHealthEngine::new(Arc::new(prober))
        .check_all(links, options)
        .await
}
