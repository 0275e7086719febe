use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three kinds of broadcast event the calendar service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Live,
    Replay,
    Prerecorded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub until: Option<NaiveDateTime>,
    #[serde(default)]
    pub count: Option<u32>,
    pub rule: String,
}

/// A recurring event definition. Naive timestamps are interpreted in `timezone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub show: Uuid,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: Tz,
    pub recurrence: Option<RecurrenceRule>,
}

impl Event {
    /// Interprets a naive timestamp as local time in this event's
    /// timezone and converts it to naive UTC. Every `EventInstance` time
    /// and the event's own `start`/`end` are in event-local time, not
    /// UTC, and must go through this before being compared against `now`
    /// or any other UTC instant.
    pub fn to_utc(&self, naive_local: NaiveDateTime) -> NaiveDateTime {
        match self.timezone.from_local_datetime(&naive_local) {
            chrono::LocalResult::Single(dt) => dt.naive_utc(),
            chrono::LocalResult::Ambiguous(dt, _) => dt.naive_utc(),
            chrono::LocalResult::None => naive_local,
        }
    }
}

/// A single materialized occurrence of an `Event`, expanded from its
/// recurrence rule. Times are naive and expressed in the owning event's
/// timezone, not UTC; convert with [`Event::to_utc`] before comparing
/// against `now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInstance {
    pub event: Uuid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// An event together with its expanded instances over the requested window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSchedule {
    pub event: Event,
    pub instances: Vec<EventInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleListResponse {
    pub count: usize,
    pub schedules: Vec<EventSchedule>,
}
