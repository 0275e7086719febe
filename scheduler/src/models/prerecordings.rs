use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pre-recorded take submitted ahead of a `prerecorded` event.
/// Identified by the pair `(event, start)`, not a surrogate id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prerecording {
    pub event: Uuid,
    pub start: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrerecordingListResponse {
    pub count: usize,
    pub entries: Vec<Prerecording>,
}
