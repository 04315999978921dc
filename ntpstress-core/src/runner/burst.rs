use std::num::NonZeroU64;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;

use super::counter::BurstCounter;
use super::stats::StepResult;
use crate::probe::Probe;

/// Dispatches `rate` concurrent probes and waits for every one of them.
///
/// Returns only after all probes have reported, so `attempted == rate` always holds.
/// A probe task that panics or is cancelled counts as a failure.
pub async fn run_burst(rate: NonZeroU64, server: Arc<str>, probe: Arc<dyn Probe>) -> StepResult {
    let counter = Arc::new(BurstCounter::new());
    let started = Instant::now();

    let mut tasks = JoinSet::new();
    for _ in 0..rate.get() {
        let counter = counter.clone();
        let server = server.clone();
        let probe = probe.clone();
        tasks.spawn(async move {
            let outcome = probe.probe(&server).await;
            counter.record(outcome.is_success());
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::warn!(probe = probe.name(), error = %err, "probe task did not complete");
            counter.record(false);
        }
    }

    let elapsed = started.elapsed();
    let snap = counter.snapshot();
    tracing::debug!(
        rate = rate.get(),
        attempted = snap.attempted,
        failed = snap.failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "burst complete"
    );

    StepResult {
        rate,
        attempted: snap.attempted,
        failed: snap.failed,
        elapsed,
    }
}
