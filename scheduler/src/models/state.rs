use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{CancelledTask, CompletedTask, FailedTask, PendingTask, RunningTask, Status, TaskIndex};

/// The five partitions a task can live in, keyed by id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Tasks {
    #[serde(default)]
    pub pending: HashMap<Uuid, PendingTask>,
    #[serde(default)]
    pub running: HashMap<Uuid, RunningTask>,
    #[serde(default)]
    pub cancelled: HashMap<Uuid, CancelledTask>,
    #[serde(default)]
    pub failed: HashMap<Uuid, FailedTask>,
    #[serde(default)]
    pub completed: HashMap<Uuid, CompletedTask>,
}

impl Tasks {
    pub fn index(&self) -> TaskIndex {
        TaskIndex {
            pending: self.pending.keys().copied().collect(),
            running: self.running.keys().copied().collect(),
            cancelled: self.cancelled.keys().copied().collect(),
            failed: self.failed.keys().copied().collect(),
            completed: self.completed.keys().copied().collect(),
        }
    }
}

/// Bidirectional dependency edges, kept alongside `Tasks` so garbage
/// collection can find and sever them without scanning every task.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Relationships {
    /// task id -> ids of tasks that depend on it
    #[serde(default)]
    pub dependents: HashMap<Uuid, HashSet<Uuid>>,
    /// task id -> ids of tasks it depends on
    #[serde(default)]
    pub dependencies: HashMap<Uuid, HashSet<Uuid>>,
}

impl Relationships {
    pub fn link(&mut self, task: Uuid, depends_on: Uuid) {
        self.dependents.entry(depends_on).or_default().insert(task);
        self.dependencies.entry(task).or_default().insert(depends_on);
    }

    pub fn forget(&mut self, task: Uuid) {
        if let Some(deps) = self.dependencies.remove(&task) {
            for dep in deps {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(&task);
                }
            }
        }
        self.dependents.remove(&task);
    }
}

/// The entire persisted state of the scheduler: one JSON document, written
/// atomically on every mutation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub tasks: Tasks,
    #[serde(default)]
    pub statuses: HashMap<Uuid, Status>,
    #[serde(default)]
    pub relationships: Relationships,
}
