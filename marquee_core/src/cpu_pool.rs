use crate::error::CoreError;
use once_cell::sync::Lazy;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info};

static POOL_SIZE: Lazy<usize> = Lazy::new(|| {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(2)
        .clamp(1, 4)
});

static CPU_POOL: Lazy<ThreadPool> = Lazy::new(|| {
    rayon::ThreadPoolBuilder::new()
        .num_threads(*POOL_SIZE)
        .thread_name(|idx| format!("marquee-cpu-{idx}"))
        .build()
        .expect("failed to build marquee CPU pool")
});

static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

/// Run a CPU-bound job (normalization of large batches) off the async
/// runtime. Panics inside the job come back as `CoreError::Internal`.
pub async fn spawn_cpu<F, R>(job: F) -> Result<R, CoreError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let queued = IN_FLIGHT.fetch_add(1, Ordering::Relaxed) + 1;
    if queued > *POOL_SIZE * 2 {
        info!(target: "marquee.cpu_pool", queued, threads = *POOL_SIZE, "CPU pool backlog growing");
    } else {
        debug!(target: "marquee.cpu_pool", queued, "CPU task queued");
    }

    let start = Instant::now();
    CPU_POOL.spawn(move || {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|msg| (*msg).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            CoreError::Internal(format!("CPU task panicked: {}", reason))
        });
        let _ = tx.send(result);
        let remaining = IN_FLIGHT.fetch_sub(1, Ordering::Relaxed) - 1;
        debug!(
            target: "marquee.cpu_pool",
            remaining,
            latency_ms = start.elapsed().as_millis() as u64,
            "CPU task finished"
        );
    });

    rx.await
        .map_err(|err| CoreError::Internal(format!("CPU pool join error: {}", err)))?
}

pub fn worker_count() -> usize {
    *POOL_SIZE
}
