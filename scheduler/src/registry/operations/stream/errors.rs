use uuid::Uuid;

/// Everything that can go wrong while the `stream` operation assembles
/// and pushes a broadcast, expressed as a closed set rather than a
/// single catch-all so the worker can distinguish a scheduling mistake
/// (event already over) from a transient downstream failure (no
/// reservation slot available).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("event `{0}` does not exist")]
    EventNotFound(Uuid),
    #[error("no schedule covers event `{0}` at the requested instance")]
    ScheduleNotFound(Uuid),
    #[error("event `{event}` has no instance starting at `{start}`")]
    InstanceNotFound { event: Uuid, start: chrono::NaiveDateTime },
    #[error("instance of event `{0}` has already ended")]
    InstanceAlreadyEnded(Uuid),
    #[error("event `{event}` has type `{actual:?}`, expected `{expected:?}`")]
    UnexpectedEventType { event: Uuid, expected: &'static str, actual: String },
    #[error("no record or prerecording is available for event `{0}` within the lookup window")]
    DownloadUnavailable(Uuid),
    #[error("downloaded media for event `{0}` is not in a supported format")]
    UnexpectedFormat(Uuid),
    #[error("failed to obtain a streaming reservation before the deadline")]
    ReservationFailed,
}
