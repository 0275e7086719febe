use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::time::{naive_utc_now, next_aligned_tick};

use crate::config::CleanerConfig;
use crate::models::task::Spec;
use crate::scheduler::Scheduler;

/// Runs `scheduler.clean({"type": "all"})` on a fixed cadence, aligned
/// to `config.reference` rather than to the moment the process started,
/// so restarts don't shift when cleaning happens.
pub async fn run(scheduler: Scheduler, config: CleanerConfig, shutdown: CancellationToken) {
    loop {
        let now = naive_utc_now();
        let next_tick = next_aligned_tick(config.reference, chrono::TimeDelta::from_std(config.interval).unwrap_or_default(), now);
        let delay = common::time::clamped_delta(next_tick, now);

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        let strategy = Spec { kind: "all".to_owned(), parameters: json!({}) };
        match scheduler.clean(strategy).await {
            Ok(result) => {
                if !result.removed.is_empty() {
                    tracing::info!(count = result.removed.len(), "cleaned finished tasks");
                }
            }
            Err(err) => tracing::error!(error = %err, "cleaning pass failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_cleaning_ticks_to_the_configured_reference() {
        let reference = chrono::NaiveDateTime::parse_from_str("2000-01-01T00:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        let interval = chrono::TimeDelta::days(1);
        let now = reference + chrono::TimeDelta::hours(5);
        let next = next_aligned_tick(reference, interval, now);
        assert_eq!(next, reference + chrono::TimeDelta::days(1));
    }
}
