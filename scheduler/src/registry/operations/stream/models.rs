use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

/// Parameters of a `stream` task: which event, and which of its
/// instances (identified by its local start time), to push.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParameters {
    pub id: Uuid,
    pub start: NaiveDateTime,
}

/// A downloadable take selected by the [finder](super::finder), ready to
/// be fetched by the [downloader](super::downloader).
#[derive(Debug, Clone, Copy)]
pub enum Take {
    Record(crate::models::records::Record),
    Prerecording(crate::models::prerecordings::Prerecording),
}
