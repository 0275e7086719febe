use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded take of a live broadcast, as known to the records
/// service. Identified by the pair `(event, start)`, not a surrogate
/// id: `start` is the nominal instance start the recording belongs to,
/// in the owning event's local time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Record {
    pub event: Uuid,
    pub start: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordListResponse {
    pub count: usize,
    pub entries: Vec<Record>,
}
