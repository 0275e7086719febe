pub mod stream;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use common::time::{clamped_delta, naive_utc_now, next_aligned_tick};

use crate::config::SynchronizerConfig;

/// Reconciles the calendar against scheduled tasks for one kind of
/// operation. Each implementation owns its own notion of "window" (how
/// far ahead to look) and its own idempotency check.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    async fn synchronize(&self, now: NaiveDateTime) -> anyhow::Result<()>;

    fn name(&self) -> &'static str;
}

/// Runs every registered [Synchronizer] on a fixed cadence, aligned to
/// `config.reference` the same way the cleaner aligns its own ticks.
pub async fn run(synchronizers: Vec<Box<dyn Synchronizer>>, config: SynchronizerConfig, shutdown: CancellationToken) {
    loop {
        let now = naive_utc_now();
        let interval = chrono::TimeDelta::from_std(config.interval).unwrap_or_default();
        let next_tick = next_aligned_tick(config.reference, interval, now);
        let delay = clamped_delta(next_tick, now);

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        let now = naive_utc_now();
        for synchronizer in &synchronizers {
            if let Err(err) = synchronizer.synchronize(now).await {
                tracing::error!(synchronizer = synchronizer.name(), error = %err, "synchronization pass failed");
            }
        }
    }
}
