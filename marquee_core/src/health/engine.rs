use super::classify::classify;
use super::probe::LinkProber;
use super::{CheckedLink, HealthOptions, HealthStatus, HealthVerdict, RawLink};
use crate::error::{CoreError, ProbeError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Probes batches of links with bounded concurrency.
///
/// Holds no state between calls: re-checking the same links always yields
/// fresh verdicts.
pub struct LinkHealthEngine {
    prober: Arc<dyn LinkProber>,
}

impl LinkHealthEngine {
    pub fn new(prober: Arc<dyn LinkProber>) -> Self {
        Self { prober }
    }

    /// Probe every link and return them reordered: priority links first,
    /// then healthy, locked, warning and dead, each group in input order.
    pub async fn check_all(
        &self,
        links: Vec<RawLink>,
        options: &HealthOptions,
    ) -> Result<Vec<CheckedLink>, CoreError> {
        if options.concurrency_limit == 0 {
            return Err(CoreError::InvalidOptions(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if options.per_link_timeout.is_zero() {
            return Err(CoreError::InvalidOptions(
                "per-link timeout must be positive".to_string(),
            ));
        }

        let started = Instant::now();
        let total = links.len();
        let semaphore = Arc::new(Semaphore::new(options.concurrency_limit));
        let mut tasks = JoinSet::new();

        for (idx, link) in links.iter().cloned().enumerate() {
            let prober = Arc::clone(&self.prober);
            let semaphore = Arc::clone(&semaphore);
            let per_link_timeout = options.per_link_timeout;
            let slow_threshold = options.slow_threshold;
            let trusted = link.is_trusted(&options.trusted_hosts);

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (idx, HealthVerdict::dead("probe pool closed")),
                };
                let probe = tokio::time::timeout(per_link_timeout, prober.probe(&link));
                let verdict = match probe.await {
                    Ok(Ok(response)) => classify(&link, &response, slow_threshold, trusted),
                    Ok(Err(err)) => probe_failed(&link, err),
                    Err(_) => HealthVerdict::dead(format!(
                        "timeout after {}ms",
                        per_link_timeout.as_millis()
                    )),
                };
                (idx, verdict)
            });
        }

        let mut verdicts: Vec<Option<HealthVerdict>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, verdict)) => verdicts[idx] = Some(verdict),
                Err(err) => warn!(target: "marquee.health", error = %err, "probe task failed"),
            }
        }

        let mut checked: Vec<(usize, CheckedLink)> = links
            .into_iter()
            .zip(verdicts)
            .enumerate()
            .map(|(idx, (link, verdict))| {
                let mut verdict =
                    verdict.unwrap_or_else(|| HealthVerdict::dead("probe task aborted"));
                verdict.priority = verdict.status == HealthStatus::Healthy
                    && link.is_trusted(&options.trusted_hosts);
                (idx, CheckedLink { link, verdict })
            })
            .collect();

        checked.sort_by_key(|(idx, c)| (group_of(&c.verdict), *idx));

        let healthy = checked
            .iter()
            .filter(|(_, c)| c.verdict.status == HealthStatus::Healthy)
            .count();
        info!(
            target: "marquee.health",
            total,
            healthy,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "link health check finished"
        );

        Ok(checked.into_iter().map(|(_, c)| c).collect())
    }
}

fn group_of(verdict: &HealthVerdict) -> u8 {
    if verdict.priority {
        0
    } else {
        1 + verdict.status.order()
    }
}

fn probe_failed(link: &RawLink, err: ProbeError) -> HealthVerdict {
    debug!(
        target: "marquee.health",
        url = %link.url,
        kind = %err.kind(),
        error = %err,
        "probe failed"
    );
    HealthVerdict::dead(err.to_string())
}
