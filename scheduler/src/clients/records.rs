use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::models::records::Record;

use super::http::{get_json, with_retry};

/// Client for the live-recordings ("emirecords") service.
pub struct RecordsClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl RecordsClient {
    pub fn new(http: reqwest::Client, config: HttpConfig) -> Self {
        Self { http, config }
    }

    /// Pages through every record of `event` whose `start` falls in
    /// `[after, before)`, following `offset` until it reaches the
    /// server-reported `count`.
    pub async fn list_records(
        &self,
        event: Uuid,
        after: NaiveDateTime,
        before: NaiveDateTime,
    ) -> anyhow::Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset = 0usize;
        loop {
            let url = format!(
                "{}/records/{event}?after={}&before={}&offset={offset}",
                self.config.url(),
                after.format("%Y-%m-%dT%H:%M:%S"),
                before.format("%Y-%m-%dT%H:%M:%S"),
            );
            let page: crate::models::records::RecordListResponse = with_retry(|| get_json(&self.http, &url)).await?;
            let fetched = page.entries.len();
            records.extend(page.entries);
            offset += fetched;
            if offset >= page.count || fetched == 0 {
                break;
            }
        }
        Ok(records)
    }

    pub async fn download(&self, event: Uuid, start: NaiveDateTime) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}/records/{event}/{}", self.config.url(), start.format("%Y-%m-%dT%H:%M:%S"));
        Ok(self.http.get(&url).send().await?.error_for_status()?)
    }
}
