use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::config::HttpConfig;
use crate::models::calendar::{Event, EventSchedule, ScheduleListResponse};

use super::http::{get_json, with_retry};

/// Client for the calendar ("emishows") service: recurring event
/// definitions and their expanded instances over a window.
pub struct CalendarClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl CalendarClient {
    pub fn new(http: reqwest::Client, config: HttpConfig) -> Self {
        Self { http, config }
    }

    pub async fn get_event(&self, event: Uuid) -> anyhow::Result<Event> {
        let url = format!("{}/events/{event}", self.config.url());
        with_retry(|| get_json(&self.http, &url)).await
    }

    /// Lists every event schedule (definition + expanded instances)
    /// overlapping `[start, end)`.
    pub async fn list_schedules(&self, start: NaiveDateTime, end: NaiveDateTime) -> anyhow::Result<ScheduleListResponse> {
        let url = format!(
            "{}/schedule?start={}&end={}",
            self.config.url(),
            start.format("%Y-%m-%dT%H:%M:%S"),
            end.format("%Y-%m-%dT%H:%M:%S"),
        );
        with_retry(|| get_json(&self.http, &url)).await
    }

    /// Lists the schedules of a single event overlapping `[start, end)`,
    /// paging on `offset` until the server-reported count is exhausted.
    pub async fn list_schedules_for_event(
        &self,
        event: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<EventSchedule>> {
        self.list_schedules_where(start, end, &format!("id={event}")).await
    }

    /// Lists the schedules of every `live` event of `show` overlapping
    /// `[start, end)`, used to find candidate past broadcasts to replay.
    pub async fn list_live_schedules_for_show(
        &self,
        show: Uuid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<EventSchedule>> {
        self.list_schedules_where(start, end, &format!("show={show}&type=live")).await
    }

    async fn list_schedules_where(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        filter: &str,
    ) -> anyhow::Result<Vec<EventSchedule>> {
        let mut schedules = Vec::new();
        let mut offset = 0usize;
        loop {
            let url = format!(
                "{}/schedule?start={}&end={}&offset={offset}&{filter}",
                self.config.url(),
                start.format("%Y-%m-%dT%H:%M:%S"),
                end.format("%Y-%m-%dT%H:%M:%S"),
            );
            let page: ScheduleListResponse = with_retry(|| get_json(&self.http, &url)).await?;
            let fetched = page.schedules.len();
            schedules.extend(page.schedules);
            offset += fetched;
            if offset >= page.count || fetched == 0 {
                break;
            }
        }
        Ok(schedules)
    }
}
