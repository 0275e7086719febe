use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::models::prerecordings::Prerecording;

use super::http::{get_json, with_retry};

/// Client for the pre-recordings ("datarecords") service.
pub struct PrerecordingsClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl PrerecordingsClient {
    pub fn new(http: reqwest::Client, config: HttpConfig) -> Self {
        Self { http, config }
    }

    /// Pages through every prerecording of `event` whose `start` falls
    /// in `[after, before)`, following `offset` until it reaches the
    /// server-reported `count`.
    pub async fn list_prerecordings(
        &self,
        event: Uuid,
        after: NaiveDateTime,
        before: NaiveDateTime,
    ) -> anyhow::Result<Vec<Prerecording>> {
        let mut prerecordings = Vec::new();
        let mut offset = 0usize;
        loop {
            let url = format!(
                "{}/prerecordings/{event}?after={}&before={}&offset={offset}",
                self.config.url(),
                after.format("%Y-%m-%dT%H:%M:%S"),
                before.format("%Y-%m-%dT%H:%M:%S"),
            );
            let page: crate::models::prerecordings::PrerecordingListResponse =
                with_retry(|| get_json(&self.http, &url)).await?;
            let fetched = page.entries.len();
            prerecordings.extend(page.entries);
            offset += fetched;
            if offset >= page.count || fetched == 0 {
                break;
            }
        }
        Ok(prerecordings)
    }

    pub async fn download(&self, event: Uuid, start: NaiveDateTime) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}/prerecordings/{event}/{}", self.config.url(), start.format("%Y-%m-%dT%H:%M:%S"));
        Ok(self.http.get(&url).send().await?.error_for_status()?)
    }
}
