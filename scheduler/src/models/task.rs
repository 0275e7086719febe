use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A `{type, parameters}` pair, used for both operations and conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Value,
}

/// Immutable descriptor of a task, independent of its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub operation: Spec,
    pub condition: Spec,
    /// Named edges to other tasks whose completion output may feed this one.
    #[serde(default)]
    pub dependencies: HashMap<String, Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
    pub task: Task,
    pub scheduled: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningTask {
    pub task: Task,
    pub scheduled: NaiveDateTime,
    pub started: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledTask {
    pub task: Task,
    pub scheduled: NaiveDateTime,
    pub started: Option<NaiveDateTime>,
    pub cancelled: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: Task,
    pub scheduled: NaiveDateTime,
    pub started: NaiveDateTime,
    pub failed: NaiveDateTime,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    pub task: Task,
    pub scheduled: NaiveDateTime,
    pub started: NaiveDateTime,
    pub completed: NaiveDateTime,
    pub result: Value,
}

/// Status tag, kept in `State::statuses` as a redundant index of which
/// partition of `State::tasks` a task currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Running,
    Cancelled,
    Failed,
    Completed,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Cancelled | Status::Failed | Status::Completed)
    }
}

/// Tagged union of a task's record, one payload shape per lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskRecord {
    Pending(PendingTask),
    Running(RunningTask),
    Cancelled(CancelledTask),
    Failed(FailedTask),
    Completed(CompletedTask),
}

impl TaskRecord {
    pub fn status(&self) -> Status {
        match self {
            TaskRecord::Pending(_) => Status::Pending,
            TaskRecord::Running(_) => Status::Running,
            TaskRecord::Cancelled(_) => Status::Cancelled,
            TaskRecord::Failed(_) => Status::Failed,
            TaskRecord::Completed(_) => Status::Completed,
        }
    }

    pub fn task(&self) -> &Task {
        match self {
            TaskRecord::Pending(r) => &r.task,
            TaskRecord::Running(r) => &r.task,
            TaskRecord::Cancelled(r) => &r.task,
            TaskRecord::Failed(r) => &r.task,
            TaskRecord::Completed(r) => &r.task,
        }
    }
}

/// A terminal record, passed to a `CleaningStrategy`.
#[derive(Debug, Clone)]
pub enum FinishedTask {
    Cancelled(CancelledTask),
    Failed(FailedTask),
    Completed(CompletedTask),
}

impl FinishedTask {
    pub fn finished_at(&self) -> NaiveDateTime {
        match self {
            FinishedTask::Cancelled(r) => r.cancelled,
            FinishedTask::Failed(r) => r.failed,
            FinishedTask::Completed(r) => r.completed,
        }
    }
}

/// The five UUID sets returned by `tasks.list`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskIndex {
    pub pending: Vec<Uuid>,
    pub running: Vec<Uuid>,
    pub cancelled: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    pub completed: Vec<Uuid>,
}

/// Request body for `POST /tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub operation: Spec,
    pub condition: Spec,
    #[serde(default)]
    pub dependencies: HashMap<String, Uuid>,
}

/// Request body for `POST /tasks/clean`.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanRequest {
    #[serde(flatten)]
    pub strategy: Spec,
}

/// Response body for `POST /tasks/clean`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningResult {
    pub removed: Vec<Uuid>,
}
