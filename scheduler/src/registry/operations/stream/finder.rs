use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};

use crate::clients::Clients;
use crate::models::calendar::{Event, EventInstance, EventSchedule, EventType};
use crate::models::records::Record;

use super::errors::StreamError;
use super::models::{StreamParameters, Take};

/// Result of a successful [Finder::find]: the resolved event, the
/// instance within it, and the take to stream.
pub struct FindResult {
    pub event: Event,
    pub instance: EventInstance,
    pub take: Take,
}

/// Confirms an instance is streamable and decides which kind of take it
/// needs: a record of a past live broadcast (`replay`) or a
/// pre-recorded take submitted ahead of time (`prerecorded`).
pub struct Finder {
    clients: Arc<Clients>,
    window: Duration,
}

impl Finder {
    pub fn new(clients: Arc<Clients>, window: Duration) -> Self {
        Self { clients, window }
    }

    /// Looks up the calendar schedule covering the UTC day that contains
    /// `start` (in the event's own timezone) and returns the instance
    /// starting exactly at `start`.
    async fn find_instance(&self, event: &Event, start: NaiveDateTime) -> anyhow::Result<EventInstance> {
        let midnight_local = start.date().and_hms_opt(0, 0, 0).expect("midnight is a valid time");
        let window_start = event.to_utc(midnight_local);
        let window_end = window_start + TimeDelta::days(1);

        let schedules = self
            .clients
            .calendar
            .list_schedules_for_event(event.id, window_start, window_end)
            .await
            .map_err(|_| StreamError::ScheduleNotFound(event.id))?;

        schedules
            .into_iter()
            .find(|schedule| schedule.event.id == event.id)
            .and_then(|schedule| schedule.instances.into_iter().find(|instance| instance.start == start))
            .ok_or(StreamError::InstanceNotFound { event: event.id, start }.into())
    }

    fn window_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.window).unwrap_or_default()
    }

    /// Lists past `live` schedules of `show` in the configured
    /// replay-lookback window ending at `before`.
    async fn find_past_live_schedules(
        &self,
        show: uuid::Uuid,
        before: NaiveDateTime,
    ) -> anyhow::Result<Vec<EventSchedule>> {
        let start = before - self.window_delta();
        self.clients
            .calendar
            .list_live_schedules_for_show(show, start, before)
            .await
    }

    /// For each candidate schedule, lists its own records in the lookup
    /// window and keeps only the ones whose `start` matches one of that
    /// schedule's own instance starts, then returns the single record
    /// with the maximum `start` across the union of every schedule.
    async fn find_last_record(
        &self,
        schedules: &[EventSchedule],
        before: NaiveDateTime,
    ) -> anyhow::Result<Option<Record>> {
        let after = before - self.window_delta();
        let mut candidates = Vec::new();
        for schedule in schedules {
            let times: HashSet<NaiveDateTime> = schedule.instances.iter().map(|instance| instance.start).collect();
            let records = self.clients.records.list_records(schedule.event.id, after, before).await?;
            candidates.extend(records.into_iter().filter(|record| times.contains(&record.start)));
        }
        Ok(candidates.into_iter().max_by_key(|record| record.start))
    }

    pub async fn find(&self, parameters: &StreamParameters, now: NaiveDateTime) -> anyhow::Result<FindResult> {
        let event = self
            .clients
            .calendar
            .get_event(parameters.id)
            .await
            .map_err(|_| StreamError::EventNotFound(parameters.id))?;

        let instance = self.find_instance(&event, parameters.start).await?;

        if event.kind != EventType::Replay && event.kind != EventType::Prerecorded {
            return Err(StreamError::UnexpectedEventType {
                event: event.id,
                expected: "replay or prerecorded",
                actual: format!("{:?}", event.kind).to_lowercase(),
            }
            .into());
        }
        if event.to_utc(instance.end) < now {
            return Err(StreamError::InstanceAlreadyEnded(event.id).into());
        }

        let take = match event.kind {
            EventType::Prerecorded => {
                let after = instance.start - TimeDelta::seconds(1);
                let before = instance.end + TimeDelta::seconds(1);
                let prerecordings = self
                    .clients
                    .prerecordings
                    .list_prerecordings(event.id, after, before)
                    .await
                    .map_err(|_| StreamError::DownloadUnavailable(event.id))?;
                let matching = prerecordings
                    .into_iter()
                    .find(|prerecording| prerecording.start == instance.start)
                    .ok_or(StreamError::DownloadUnavailable(event.id))?;
                Take::Prerecording(matching)
            }
            EventType::Replay => {
                let schedules = self
                    .find_past_live_schedules(event.show, instance.start)
                    .await
                    .map_err(|_| StreamError::DownloadUnavailable(event.id))?;
                let record = self
                    .find_last_record(&schedules, instance.start)
                    .await
                    .map_err(|_| StreamError::DownloadUnavailable(event.id))?
                    .ok_or(StreamError::DownloadUnavailable(event.id))?;
                Take::Record(record)
            }
            EventType::Live => unreachable!("already rejected above"),
        };

        Ok(FindResult { event, instance, take })
    }
}
