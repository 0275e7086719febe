use chrono::{NaiveDateTime, TimeDelta};
use tokio_util::sync::CancellationToken;

use common::time::{clamped_delta, naive_utc_now};

/// Sleeps until `instant - delta` (clamped to zero if already past),
/// cancellable. Reused for both the pre-reservation wait (`instance.start
/// - 10s`) and the pre-stream wait (`instance.start - 1s`) — the same
/// "sleep until an absolute instant" shape, parameterized only by delta.
pub struct Waiter;

impl Waiter {
    pub async fn wait_until(&self, instant: NaiveDateTime, delta: TimeDelta, cancel: &CancellationToken) -> anyhow::Result<()> {
        let target = instant - delta;
        let delay = clamped_delta(target, naive_utc_now());
        tokio::select! {
            _ = cancel.cancelled() => Err(anyhow::anyhow!("cancelled while waiting")),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
