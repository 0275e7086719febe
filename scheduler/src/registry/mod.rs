pub mod cleaning;
pub mod conditions;
pub mod operations;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::models::task::FinishedTask;

/// Something a task waits on before its operation runs. Implementations
/// must be cancellation-aware: `wait` may be aborted by the caller racing
/// it against a `CancellationToken`, at which point its side effects (if
/// any) must already be safe to simply drop.
#[async_trait]
pub trait Condition: Send + Sync {
    async fn wait(&self, parameters: &Value) -> anyhow::Result<()>;
}

/// The unit of work a task performs once its condition and dependencies
/// are satisfied.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn run(
        &self,
        parameters: Value,
        dependencies: HashMap<String, Value>,
        cancel: CancellationToken,
    ) -> anyhow::Result<Value>;
}

/// Decides, for a single finished task, whether the cleaner should remove
/// it from the store.
pub trait CleaningStrategy: Send + Sync {
    fn should_remove(&self, task: &FinishedTask, parameters: &Value, now: chrono::NaiveDateTime) -> bool;
}

/// A name-keyed set of constructed, shareable instances. Unlike the
/// Python original's per-call `factory.create(type)`, instances here are
/// built once at startup and handed out as `Arc` clones, since none of
/// them carry per-invocation state.
pub struct Registry<T: ?Sized> {
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn register(&mut self, kind: impl Into<String>, instance: Arc<T>) {
        self.entries.insert(kind.into(), instance);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<T>> {
        self.entries.get(kind).cloned()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type ConditionRegistry = Registry<dyn Condition>;
pub type OperationRegistry = Registry<dyn Operation>;
pub type CleaningStrategyRegistry = Registry<dyn CleaningStrategy>;
