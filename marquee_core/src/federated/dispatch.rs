//! Concurrent fan-out of one query to every enabled source.
//!
//! Each adapter runs as its own task with a private result slot. Slots are
//! merged only after every task settled or the overall deadline fired.

use super::{DispatchOutcome, Query, RawCandidate, SourceResults};
use crate::error::{CoreError, SourceError};
use crate::SourceAdapter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at};
use tracing::{debug, warn};

enum Slot {
    Pending,
    Done(SourceResults),
    Failed(SourceError),
}

/// Query every adapter concurrently and collect whatever settles before
/// `overall_deadline`.
///
/// Per-source failures, timeouts and cancellations are recorded in the
/// outcome; the only error returned is a contract violation on the timings.
pub async fn dispatch(
    query: &Query,
    adapters: &[Arc<dyn SourceAdapter>],
    per_source_timeout: Duration,
    overall_deadline: Duration,
) -> Result<DispatchOutcome, CoreError> {
    validate_timings(per_source_timeout, overall_deadline)?;

    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + overall_deadline;

    let mut slots: Vec<Slot> = adapters.iter().map(|_| Slot::Pending).collect();
    let mut task_index = HashMap::with_capacity(adapters.len());
    let mut tasks = JoinSet::new();

    for (idx, adapter) in adapters.iter().enumerate() {
        let adapter = Arc::clone(adapter);
        let query = query.clone();

        let handle = tasks.spawn(async move {
            let source = adapter.id().to_string();
            let start = Instant::now();
            let slot = match timeout(per_source_timeout, adapter.search(&query)).await {
                Ok(Ok(candidates)) => {
                    let mut results = SourceResults::new(&source, restamp(&source, candidates));
                    results.duration_ms = Some(start.elapsed().as_millis() as u64);
                    Slot::Done(results)
                }
                Ok(Err(mut err)) => {
                    err.source_id = source;
                    Slot::Failed(err)
                }
                Err(_) => Slot::Failed(SourceError::timeout(
                    source,
                    per_source_timeout.as_millis(),
                )),
            };
            (idx, slot)
        });
        task_index.insert(handle.id(), idx);
    }

    let collect = async {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, slot)) => slots[idx] = slot,
                Err(join_err) => {
                    if let Some(&idx) = task_index.get(&join_err.id()) {
                        let source = adapters[idx].id().to_string();
                        slots[idx] = Slot::Failed(SourceError::failure(
                            source,
                            format!("adapter task panicked: {}", join_err),
                        ));
                    }
                }
            }
        }
    };

    if timeout_at(deadline, collect).await.is_err() {
        debug!(
            target: "marquee.dispatch",
            remaining = tasks.len(),
            "overall deadline reached, cancelling remaining sources"
        );
        tasks.abort_all();
    }
    drop(tasks);

    let mut outcome = DispatchOutcome::default();
    for (idx, slot) in slots.into_iter().enumerate() {
        let source = adapters[idx].id();
        match slot {
            Slot::Done(results) => {
                debug!(
                    target: "marquee.dispatch",
                    source,
                    count = results.candidates.len(),
                    duration_ms = results.duration_ms,
                    "source completed"
                );
                outcome.results.push(results);
            }
            Slot::Failed(err) => {
                warn!(
                    target: "marquee.dispatch",
                    source,
                    kind = %err.kind,
                    detail = %err.detail,
                    "source failed"
                );
                outcome.errors.push(err);
            }
            Slot::Pending => {
                warn!(target: "marquee.dispatch", source, "source cancelled at deadline");
                outcome.errors.push(SourceError::cancelled(source));
            }
        }
    }

    debug!(
        target: "marquee.dispatch",
        completed = outcome.results.len(),
        failed = outcome.errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dispatch finished"
    );

    Ok(outcome)
}

pub(crate) fn validate_timings(
    per_source_timeout: Duration,
    overall_deadline: Duration,
) -> Result<(), CoreError> {
    if per_source_timeout.is_zero() || overall_deadline.is_zero() {
        return Err(CoreError::InvalidOptions(
            "timeouts must be positive".to_string(),
        ));
    }
    if per_source_timeout >= overall_deadline {
        return Err(CoreError::InvalidOptions(format!(
            "per-source timeout ({}ms) must be shorter than the overall deadline ({}ms)",
            per_source_timeout.as_millis(),
            overall_deadline.as_millis()
        )));
    }
    Ok(())
}

fn restamp(source: &str, mut candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
    for candidate in &mut candidates {
        if candidate.source != source {
            candidate.source = source.to_string();
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    enum Behaviour {
        Instant(usize),
        Fail,
        Sleep(Duration),
        Panic,
    }

    struct MockSource {
        id: String,
        behaviour: Behaviour,
    }

    impl MockSource {
        fn new(id: &str, behaviour: Behaviour) -> Arc<dyn SourceAdapter> {
            Arc::new(Self {
                id: id.to_string(),
                behaviour,
            })
        }
    }

    #[async_trait]
    impl SourceAdapter for MockSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn search(&self, query: &Query) -> Result<Vec<RawCandidate>, SourceError> {
            match &self.behaviour {
                Behaviour::Instant(n) => Ok((0..*n)
                    .map(|i| {
                        RawCandidate::new(
                            "wrong-id",
                            format!("{} {}", query.title, i),
                            format!("https://{}/{}", self.id, i),
                        )
                    })
                    .collect()),
                Behaviour::Fail => Err(SourceError::failure(&self.id, "HTTP 502")),
                Behaviour::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(vec![])
                }
                Behaviour::Panic => panic!("scraper blew up"),
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_collects_in_adapter_order() {
        let adapters = vec![
            MockSource::new("moviezwap", Behaviour::Sleep(Duration::from_millis(30))),
            MockSource::new("downloadhub", Behaviour::Instant(2)),
            MockSource::new("movierulz", Behaviour::Fail),
        ];

        let outcome = dispatch(
            &Query::new("Jawan"),
            &adapters,
            Duration::from_millis(500),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let sources: Vec<_> = outcome.results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["moviezwap", "downloadhub"]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source_id, "movierulz");
        assert_eq!(outcome.errors[0].kind, crate::ErrorKind::SourceFailure);

        let hub = outcome.results_for("downloadhub").unwrap();
        assert!(hub.candidates.iter().all(|c| c.source == "downloadhub"));
        assert!(hub.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_per_source_timeout() {
        let adapters = vec![
            MockSource::new("slow", Behaviour::Sleep(Duration::from_secs(10))),
            MockSource::new("fast", Behaviour::Instant(1)),
        ];

        let outcome = dispatch(
            &Query::new("Leo"),
            &adapters,
            Duration::from_millis(50),
            Duration::from_secs(2),
        )
        .await
        .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let err = outcome.error_for("slow").unwrap();
        assert_eq!(err.kind, crate::ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_dispatch_panicking_adapter_is_source_failure() {
        let adapters = vec![
            MockSource::new("broken", Behaviour::Panic),
            MockSource::new("fine", Behaviour::Instant(1)),
        ];

        let outcome = dispatch(
            &Query::new("Pushpa"),
            &adapters,
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .await
        .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let err = outcome.error_for("broken").unwrap();
        assert_eq!(err.kind, crate::ErrorKind::SourceFailure);
        assert!(err.detail.contains("panicked"));
    }

    #[tokio::test]
    async fn test_dispatch_no_adapters() {
        let outcome = dispatch(
            &Query::new("anything"),
            &[],
            Duration::from_millis(10),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.errors.is_empty());
        assert!(!outcome.all_failed());
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_timings() {
        let adapters = vec![MockSource::new("a", Behaviour::Instant(1))];
        let q = Query::new("x");

        let equal = dispatch(&q, &adapters, Duration::from_secs(1), Duration::from_secs(1)).await;
        assert!(matches!(equal, Err(CoreError::InvalidOptions(_))));

        let zero = dispatch(&q, &adapters, Duration::ZERO, Duration::from_secs(1)).await;
        assert!(matches!(zero, Err(CoreError::InvalidOptions(_))));
    }
}
