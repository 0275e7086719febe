use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::json;
use uuid::Uuid;

use crate::clients::Clients;
use crate::models::calendar::EventType;
use crate::models::task::{Spec, Status};
use crate::registry::operations::stream::models::StreamParameters;
use crate::scheduler::Scheduler;

use super::Synchronizer;

/// How far ahead of an instance's start its `stream` task's `at`
/// condition fires, so the download/reserve/push pipeline has warmed up
/// by the time the instance actually starts. Hard-coded in the original
/// source rather than configurable; kept as a constant here.
const PRE_ROLL: chrono::TimeDelta = chrono::TimeDelta::minutes(15);

/// Reconciles the scheduler's `stream` tasks against the calendar's
/// upcoming `replay`/`prerecorded` instances over `[now, now+window)`:
/// tasks whose parameters no longer parse, whose event no longer
/// exists, or whose event/instance no longer appears in that window,
/// are cancelled; instances with no covering task get one scheduled,
/// with an `at` condition set 15 minutes ahead of the instance's start
/// (converted to UTC).
pub struct StreamSynchronizer {
    scheduler: Scheduler,
    clients: Arc<Clients>,
    window: Duration,
}

impl StreamSynchronizer {
    pub fn new(scheduler: Scheduler, clients: Arc<Clients>, window: Duration) -> Self {
        Self { scheduler, clients, window }
    }
}

#[async_trait]
impl Synchronizer for StreamSynchronizer {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn synchronize(&self, now: NaiveDateTime) -> anyhow::Result<()> {
        let window = chrono::TimeDelta::from_std(self.window).unwrap_or_default();
        let end = now + window;
        let schedules = self.clients.calendar.list_schedules(now, end).await?;

        // Every (event, instance.start) that should have a stream task,
        // restricted to the reconciled window (instance start converted to
        // UTC via the owning event's timezone) and to streamable event types.
        let mut scheduled: Vec<(Uuid, NaiveDateTime)> = Vec::new();
        for schedule in &schedules.schedules {
            if !matches!(schedule.event.kind, EventType::Replay | EventType::Prerecorded) {
                continue;
            }
            for instance in &schedule.instances {
                let istart = schedule.event.to_utc(instance.start);
                if istart >= now && istart < end {
                    scheduled.push((schedule.event.id, instance.start));
                }
            }
        }

        // Every currently pending/running `stream` task, with its parsed
        // parameters when they parse ("valid") and without otherwise
        // ("invalid" -- these are cancelled unconditionally).
        let index = self.scheduler.list().await;
        let mut valid: Vec<(Uuid, (Uuid, NaiveDateTime))> = Vec::new();
        for id in index.pending.into_iter().chain(index.running) {
            let Some(record) = self.scheduler.get(id).await else { continue };
            if !matches!(record.status(), Status::Pending | Status::Running) {
                continue;
            }
            let task = record.task();
            if task.operation.kind != "stream" {
                continue;
            }
            let Ok(params) = serde_json::from_value::<StreamParameters>(task.operation.parameters.clone()) else {
                if let Err(err) = self.scheduler.cancel(id).await {
                    tracing::warn!(task = %id, error = %err, "failed to cancel invalid stream task");
                }
                continue;
            };

            let Ok(event) = self.clients.calendar.get_event(params.id).await else {
                if let Err(err) = self.scheduler.cancel(id).await {
                    tracing::warn!(task = %id, error = %err, "failed to cancel stream task for unknown event");
                }
                continue;
            };

            let istart = event.to_utc(params.start);
            if istart >= now && istart < end {
                valid.push((id, (params.id, params.start)));
            }
        }

        // Cancel extras: a valid task whose (event, instance) no longer
        // appears among the reconciled schedule.
        for (id, key) in &valid {
            if !scheduled.contains(key) {
                if let Err(err) = self.scheduler.cancel(*id).await {
                    tracing::warn!(task = %id, error = %err, "failed to cancel stale stream task");
                }
            }
        }

        // Add missing: a scheduled instance with no valid task covering it.
        for (event_id, instance_start) in scheduled {
            if valid.iter().any(|(_, key)| *key == (event_id, instance_start)) {
                continue;
            }
            let Some(schedule) = schedules.schedules.iter().find(|schedule| schedule.event.id == event_id) else {
                continue;
            };

            let utcstart = schedule.event.to_utc(instance_start);
            let at = utcstart - PRE_ROLL;
            let operation =
                Spec { kind: "stream".to_owned(), parameters: json!({ "id": event_id, "start": instance_start }) };
            let condition = Spec { kind: "at".to_owned(), parameters: json!({ "datetime": at }) };

            if let Err(err) = self.scheduler.schedule(operation, condition, Default::default()).await {
                tracing::error!(event = %event_id, error = %err, "failed to schedule stream task");
            }
        }

        Ok(())
    }
}
