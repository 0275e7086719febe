mod downloader;
pub mod errors;
mod finder;
pub(crate) mod models;
mod reserver;
mod runner;
mod waiter;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use common::time::naive_utc_now;

use crate::clients::Clients;
use crate::config::SrtConfig;
use crate::registry::Operation;

use downloader::Downloader;
use finder::Finder;
use models::StreamParameters;
use reserver::Reserver;
use runner::Runner;
use waiter::Waiter;

/// How far ahead of the instance's start the first reservation attempt fires.
fn pre_reserve_delta() -> chrono::TimeDelta {
    chrono::TimeDelta::seconds(10)
}
/// How far ahead of the instance's start the push itself begins.
fn pre_stream_delta() -> chrono::TimeDelta {
    chrono::TimeDelta::seconds(1)
}

/// Downloads the right take for a broadcast instance, reserves a
/// streaming slot, and pushes the take over SRT until it finishes or is
/// cancelled. Composed from five single-purpose collaborators rather
/// than implemented as one function, mirroring how the pipeline this
/// operation automates is staffed by distinct roles end to end.
pub struct StreamOperation {
    srt: SrtConfig,
    /// Deadline for the reservation 409-retry loop (`operations.stream.timeout`).
    reservation_timeout: Duration,
    finder: Finder,
    downloader: Downloader,
    reserver: Reserver,
    waiter: Waiter,
    runner: Runner,
}

impl StreamOperation {
    pub fn new(clients: Arc<Clients>, srt: SrtConfig, window: Duration, reservation_timeout: Duration) -> Self {
        Self {
            srt,
            reservation_timeout,
            finder: Finder::new(clients.clone(), window),
            downloader: Downloader::new(clients.clone()),
            reserver: Reserver::new(clients),
            waiter: Waiter,
            runner: Runner,
        }
    }
}

#[async_trait]
impl Operation for StreamOperation {
    async fn run(
        &self,
        parameters: Value,
        _dependencies: HashMap<String, Value>,
        cancel: CancellationToken,
    ) -> anyhow::Result<Value> {
        let params: StreamParameters = serde_json::from_value(parameters)?;
        let now = naive_utc_now();

        let found = self.finder.find(&params, now).await?;
        let instance_start_utc = found.event.to_utc(found.instance.start);

        let tempdir = TempDir::new()?;
        let take = self.downloader.download(&found.take, params.id, tempdir.path()).await?;

        self.waiter.wait_until(instance_start_utc, pre_reserve_delta(), &cancel).await?;

        let deadline = tokio::time::Instant::now() + self.reservation_timeout;
        let credentials = self.reserver.reserve(params.id, take.format, deadline, &cancel).await?;

        self.waiter.wait_until(instance_start_utc, pre_stream_delta(), &cancel).await?;

        self.runner.run(&take.path, take.format, &credentials, &self.srt, cancel).await?;

        Ok(json!({ "id": params.id, "start": params.start }))
    }
}
