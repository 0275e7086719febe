use uuid::Uuid;

use crate::models::task::Status;

/// Errors raised by the scheduler core, independent of how they are
/// surfaced (HTTP, logs, ...).
#[derive(Debug, Clone)]
pub enum SchedulerError {
    /// No `Operation` is registered under this type name.
    InvalidOperation(String),
    /// No `Condition` is registered under this type name.
    InvalidCondition(String),
    /// No `CleaningStrategy` is registered under this type name.
    InvalidCleaningStrategy(String),
    /// A dependency referenced a task id that does not exist.
    DependencyNotFound(Uuid),
    /// No task exists with this id.
    TaskNotFound(Uuid),
    /// The task exists, but not in the status the caller expected
    /// (e.g. cancelling a task that already finished).
    UnexpectedTaskStatus { task: Uuid, expected: Vec<Status>, actual: Status },
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::InvalidOperation(kind) => write!(f, "no operation registered for type `{kind}`"),
            SchedulerError::InvalidCondition(kind) => write!(f, "no condition registered for type `{kind}`"),
            SchedulerError::InvalidCleaningStrategy(kind) => {
                write!(f, "no cleaning strategy registered for type `{kind}`")
            }
            SchedulerError::DependencyNotFound(id) => write!(f, "dependency task `{id}` does not exist"),
            SchedulerError::TaskNotFound(id) => write!(f, "task `{id}` does not exist"),
            SchedulerError::UnexpectedTaskStatus { task, expected, actual } => {
                write!(f, "task `{task}` is `{actual:?}`, expected one of `{expected:?}`")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}
