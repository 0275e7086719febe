mod worker;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::time::naive_utc_now;

use crate::error::SchedulerError;
use crate::models::state::State;
use crate::models::task::{
    CancelledTask, CleaningResult, FailedTask, FinishedTask, PendingTask, Spec, Status, Task, TaskIndex, TaskRecord,
};
use crate::registry::{CleaningStrategyRegistry, ConditionRegistry, OperationRegistry};
use crate::store::Store;

/// Everything a worker or an API handler needs while holding the single
/// state mutex: the persisted state itself, plus the per-task
/// coordination primitives that do not belong in the JSON document.
struct Inner {
    state: State,
    /// Fired whenever a task reaches a terminal status, so workers
    /// blocked on a dependency wake up instead of polling.
    signals: HashMap<Uuid, Arc<Notify>>,
    /// Lets `cancel` abort a task's worker at whichever await point it
    /// is currently suspended on.
    tokens: HashMap<Uuid, CancellationToken>,
}

/// Owns the task graph and drives each task's worker to completion.
/// Cloning a `Scheduler` is cheap; every clone shares the same
/// underlying state behind an `Arc<Mutex<_>>`, matching how the rest of
/// the server hands the scheduler to request handlers and background
/// loops alike.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Mutex<Inner>>,
    store: Arc<Store>,
    conditions: Arc<ConditionRegistry>,
    operations: Arc<OperationRegistry>,
    cleaning_strategies: Arc<CleaningStrategyRegistry>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Loads persisted state and spawns a worker for every task that
    /// isn't already in a terminal status. Tasks found `Running` are
    /// moved to `Failed`: the process that was running them is gone.
    pub async fn restore(
        store: Store,
        conditions: ConditionRegistry,
        operations: OperationRegistry,
        cleaning_strategies: CleaningStrategyRegistry,
    ) -> anyhow::Result<Self> {
        let mut state = store.load().await?;

        let stale: Vec<Uuid> = state.tasks.running.keys().copied().collect();
        for id in stale {
            if let Some(running) = state.tasks.running.remove(&id) {
                let failed = FailedTask {
                    task: running.task,
                    scheduled: running.scheduled,
                    started: running.started,
                    failed: naive_utc_now(),
                    error: "InterruptedByRestart".to_owned(),
                };
                state.tasks.failed.insert(id, failed);
                state.statuses.insert(id, Status::Failed);
            }
        }
        store.save(&state).await?;

        let pending_ids: Vec<Uuid> = state.tasks.pending.keys().copied().collect();

        let scheduler = Self {
            inner: Arc::new(Mutex::new(Inner { state, signals: HashMap::new(), tokens: HashMap::new() })),
            store: Arc::new(store),
            conditions: Arc::new(conditions),
            operations: Arc::new(operations),
            cleaning_strategies: Arc::new(cleaning_strategies),
            shutdown: CancellationToken::new(),
        };

        for id in pending_ids {
            scheduler.spawn_worker(id).await;
        }

        Ok(scheduler)
    }

    /// Trips every task's cancellation token. Used for graceful
    /// shutdown; it does not wait for workers to finish.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn spawn_worker(&self, id: Uuid) {
        let token = self.shutdown.child_token();
        {
            let mut inner = self.inner.lock().await;
            inner.tokens.insert(id, token.clone());
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            worker::run(scheduler, id, token).await;
        });
    }

    pub async fn schedule(
        &self,
        operation: Spec,
        condition: Spec,
        dependencies: HashMap<String, Uuid>,
    ) -> Result<PendingTask, SchedulerError> {
        if self.operations.get(&operation.kind).is_none() {
            return Err(SchedulerError::InvalidOperation(operation.kind));
        }
        if self.conditions.get(&condition.kind).is_none() {
            return Err(SchedulerError::InvalidCondition(condition.kind));
        }

        let id = Uuid::new_v4();
        let now = naive_utc_now();
        let task = Task { id, operation, condition, dependencies: dependencies.clone() };
        let record = PendingTask { task, scheduled: now };

        {
            let mut inner = self.inner.lock().await;
            for dep_id in dependencies.values() {
                if !inner.state.statuses.contains_key(dep_id) {
                    return Err(SchedulerError::DependencyNotFound(*dep_id));
                }
            }
            inner.state.tasks.pending.insert(id, record.clone());
            inner.state.statuses.insert(id, Status::Pending);
            for dep_id in dependencies.values() {
                inner.state.relationships.link(id, *dep_id);
            }
            self.store
                .save(&inner.state)
                .await
                .expect("persisting scheduler state must not fail");
        }

        self.spawn_worker(id).await;
        Ok(record)
    }

    /// Cancels a task. The state transition and the signal it fires are
    /// synchronous with respect to this call returning; the worker's own
    /// teardown (if it was mid-flight) happens afterwards in the
    /// background.
    pub async fn cancel(&self, id: Uuid) -> Result<CancelledTask, SchedulerError> {
        let mut inner = self.inner.lock().await;
        let now = naive_utc_now();

        let cancelled = match inner.state.statuses.get(&id).copied() {
            None => return Err(SchedulerError::TaskNotFound(id)),
            Some(Status::Pending) => {
                let pending = inner.state.tasks.pending.remove(&id).expect("status/tasks out of sync");
                CancelledTask { task: pending.task, scheduled: pending.scheduled, started: None, cancelled: now }
            }
            Some(Status::Running) => {
                let running = inner.state.tasks.running.remove(&id).expect("status/tasks out of sync");
                CancelledTask {
                    task: running.task,
                    scheduled: running.scheduled,
                    started: Some(running.started),
                    cancelled: now,
                }
            }
            Some(actual) => {
                return Err(SchedulerError::UnexpectedTaskStatus {
                    task: id,
                    expected: vec![Status::Pending, Status::Running],
                    actual,
                })
            }
        };

        inner.state.tasks.cancelled.insert(id, cancelled.clone());
        inner.state.statuses.insert(id, Status::Cancelled);
        self.store.save(&inner.state).await.expect("persisting scheduler state must not fail");

        if let Some(token) = inner.tokens.remove(&id) {
            token.cancel();
        }
        if let Some(signal) = inner.signals.get(&id) {
            signal.notify_waiters();
        }

        Ok(cancelled)
    }

    pub async fn clean(&self, strategy: Spec) -> Result<CleaningResult, SchedulerError> {
        let evaluator = self
            .cleaning_strategies
            .get(&strategy.kind)
            .ok_or(SchedulerError::InvalidCleaningStrategy(strategy.kind))?;

        let mut inner = self.inner.lock().await;
        let now = naive_utc_now();
        let mut removed = Vec::new();

        // A finished task still referenced as a dependency by a non-terminal
        // task must survive cleaning even if the strategy says to remove it:
        // the dependent worker still needs to read its `result`/status.
        let still_needed = |inner: &Inner, id: &Uuid| {
            inner.state.relationships.dependents.get(id).is_some_and(|dependents| {
                dependents.iter().any(|dependent| {
                    matches!(
                        inner.state.statuses.get(dependent),
                        Some(Status::Pending) | Some(Status::Running)
                    )
                })
            })
        };

        for id in inner.state.tasks.cancelled.keys().copied().collect::<Vec<_>>() {
            if still_needed(&inner, &id) {
                continue;
            }
            let record = inner.state.tasks.cancelled[&id].clone();
            if evaluator.should_remove(&FinishedTask::Cancelled(record), &strategy.parameters, now) {
                removed.push(id);
            }
        }
        for id in inner.state.tasks.failed.keys().copied().collect::<Vec<_>>() {
            if still_needed(&inner, &id) {
                continue;
            }
            let record = inner.state.tasks.failed[&id].clone();
            if evaluator.should_remove(&FinishedTask::Failed(record), &strategy.parameters, now) {
                removed.push(id);
            }
        }
        for id in inner.state.tasks.completed.keys().copied().collect::<Vec<_>>() {
            if still_needed(&inner, &id) {
                continue;
            }
            let record = inner.state.tasks.completed[&id].clone();
            if evaluator.should_remove(&FinishedTask::Completed(record), &strategy.parameters, now) {
                removed.push(id);
            }
        }

        for id in &removed {
            inner.state.tasks.cancelled.remove(id);
            inner.state.tasks.failed.remove(id);
            inner.state.tasks.completed.remove(id);
            inner.state.statuses.remove(id);
            inner.state.relationships.forget(*id);
            inner.signals.remove(id);
            inner.tokens.remove(id);
        }

        self.store.save(&inner.state).await.expect("persisting scheduler state must not fail");
        Ok(CleaningResult { removed })
    }

    pub async fn list(&self) -> TaskIndex {
        self.inner.lock().await.state.tasks.index()
    }

    pub async fn get(&self, id: Uuid) -> Option<TaskRecord> {
        let inner = self.inner.lock().await;
        get_record(&inner.state, id)
    }
}

fn get_record(state: &State, id: Uuid) -> Option<TaskRecord> {
    if let Some(r) = state.tasks.pending.get(&id) {
        return Some(TaskRecord::Pending(r.clone()));
    }
    if let Some(r) = state.tasks.running.get(&id) {
        return Some(TaskRecord::Running(r.clone()));
    }
    if let Some(r) = state.tasks.cancelled.get(&id) {
        return Some(TaskRecord::Cancelled(r.clone()));
    }
    if let Some(r) = state.tasks.failed.get(&id) {
        return Some(TaskRecord::Failed(r.clone()));
    }
    if let Some(r) = state.tasks.completed.get(&id) {
        return Some(TaskRecord::Completed(r.clone()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{cleaning, conditions, Operation};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken as Token;

    /// Always fails its operation; used to exercise `UnsuccessfulDependency`
    /// propagation without depending on the `stream` operation's plumbing.
    struct FailOperation;

    #[async_trait]
    impl Operation for FailOperation {
        async fn run(&self, _parameters: Value, _dependencies: HashMap<String, Value>, _cancel: Token) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    async fn test_scheduler() -> (Scheduler, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("state.json"));

        let mut operations = OperationRegistry::new();
        operations.register("test", Arc::new(crate::registry::operations::test_op::TestOperation));
        operations.register("fail", Arc::new(FailOperation));

        let scheduler = Scheduler::restore(store, conditions::build(), operations, cleaning::build())
            .await
            .unwrap();
        (scheduler, dir)
    }

    fn spec(kind: &str, parameters: Value) -> Spec {
        Spec { kind: kind.to_owned(), parameters }
    }

    async fn wait_for_terminal(scheduler: &Scheduler, id: Uuid) -> TaskRecord {
        for _ in 0..200 {
            if let Some(record) = scheduler.get(id).await {
                if record.status().is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {id} never reached a terminal status");
    }

    #[tokio::test]
    async fn schedule_and_run_a_test_task() {
        let (scheduler, _dir) = test_scheduler().await;
        let pending = scheduler
            .schedule(spec("test", json!({"k": 1})), spec("now", json!({})), HashMap::new())
            .await
            .unwrap();

        let record = wait_for_terminal(&scheduler, pending.task.id).await;
        match record {
            TaskRecord::Completed(completed) => {
                assert_eq!(completed.result, json!({"parameters": {"k": 1}, "dependencies": {}}));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dependency_chain_passes_result_through() {
        let (scheduler, _dir) = test_scheduler().await;
        let a = scheduler
            .schedule(spec("test", json!({"who": "a"})), spec("now", json!({})), HashMap::new())
            .await
            .unwrap();
        wait_for_terminal(&scheduler, a.task.id).await;

        let mut deps = HashMap::new();
        deps.insert("a".to_owned(), a.task.id);
        let b = scheduler.schedule(spec("test", json!({})), spec("now", json!({})), deps).await.unwrap();

        let record = wait_for_terminal(&scheduler, b.task.id).await;
        match record {
            TaskRecord::Completed(completed) => {
                assert_eq!(completed.result["dependencies"]["a"]["parameters"]["who"], "a");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_a_pending_at_task_before_it_starts() {
        let (scheduler, _dir) = test_scheduler().await;
        let future = common::time::naive_utc_now() + chrono::TimeDelta::hours(1);
        let pending = scheduler
            .schedule(spec("test", json!({})), spec("at", json!({"datetime": future})), HashMap::new())
            .await
            .unwrap();

        let cancelled = scheduler.cancel(pending.task.id).await.unwrap();
        assert!(cancelled.started.is_none());

        let record = scheduler.get(pending.task.id).await.unwrap();
        assert_eq!(record.status(), Status::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_an_already_terminal_task_fails() {
        let (scheduler, _dir) = test_scheduler().await;
        let pending = scheduler
            .schedule(spec("test", json!({})), spec("now", json!({})), HashMap::new())
            .await
            .unwrap();
        wait_for_terminal(&scheduler, pending.task.id).await;

        let err = scheduler.cancel(pending.task.id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnexpectedTaskStatus { .. }));
    }

    #[tokio::test]
    async fn invalid_operation_type_is_rejected_before_any_task_is_created() {
        let (scheduler, _dir) = test_scheduler().await;
        let err = scheduler
            .schedule(spec("nope", json!({})), spec("now", json!({})), HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidOperation(kind) if kind == "nope"));

        let index = scheduler.list().await;
        assert!(index.pending.is_empty());
    }

    #[tokio::test]
    async fn missing_dependency_is_rejected() {
        let (scheduler, _dir) = test_scheduler().await;
        let mut deps = HashMap::new();
        deps.insert("missing".to_owned(), Uuid::new_v4());
        let err = scheduler.schedule(spec("test", json!({})), spec("now", json!({})), deps).await.unwrap_err();
        assert!(matches!(err, SchedulerError::DependencyNotFound(_)));
    }

    #[tokio::test]
    async fn dependency_failure_propagates_as_unsuccessful_dependency() {
        let (scheduler, _dir) = test_scheduler().await;
        let a = scheduler
            .schedule(spec("fail", json!({})), spec("now", json!({})), HashMap::new())
            .await
            .unwrap();
        let a_record = wait_for_terminal(&scheduler, a.task.id).await;
        assert_eq!(a_record.status(), Status::Failed);

        let mut deps = HashMap::new();
        deps.insert("a".to_owned(), a.task.id);
        let b = scheduler.schedule(spec("test", json!({})), spec("now", json!({})), deps).await.unwrap();

        let b_record = wait_for_terminal(&scheduler, b.task.id).await;
        match b_record {
            TaskRecord::Failed(failed) => {
                assert!(failed.error.starts_with("UnsuccessfulDependency"));
                assert!(failed.error.contains(&a.task.id.to_string()));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dependency_failure_waits_for_dependency_still_in_flight() {
        let (scheduler, _dir) = test_scheduler().await;
        let future = common::time::naive_utc_now() + chrono::TimeDelta::milliseconds(100);
        let a = scheduler
            .schedule(spec("fail", json!({})), spec("at", json!({"datetime": future})), HashMap::new())
            .await
            .unwrap();

        let mut deps = HashMap::new();
        deps.insert("a".to_owned(), a.task.id);
        let b = scheduler.schedule(spec("test", json!({})), spec("now", json!({})), deps).await.unwrap();

        // b must park on a's status-changed signal rather than failing immediately
        let b_record = wait_for_terminal(&scheduler, b.task.id).await;
        assert_eq!(b_record.status(), Status::Failed);
    }

    #[tokio::test]
    async fn clean_all_removes_every_finished_task_but_not_referenced_ones() {
        let (scheduler, _dir) = test_scheduler().await;
        let a = scheduler
            .schedule(spec("test", json!({})), spec("now", json!({})), HashMap::new())
            .await
            .unwrap();
        wait_for_terminal(&scheduler, a.task.id).await;

        // b depends on a and stays pending forever (its own condition never fires).
        let far_future = common::time::naive_utc_now() + chrono::TimeDelta::days(365);
        let mut deps = HashMap::new();
        deps.insert("a".to_owned(), a.task.id);
        let b = scheduler
            .schedule(spec("test", json!({})), spec("at", json!({"datetime": far_future})), deps)
            .await
            .unwrap();

        let result = scheduler.clean(spec("all", json!({}))).await.unwrap();
        assert!(!result.removed.contains(&a.task.id), "a is still referenced by pending b");
        assert!(scheduler.get(a.task.id).await.is_some());

        scheduler.cancel(b.task.id).await.unwrap();
        let result = scheduler.clean(spec("all", json!({}))).await.unwrap();
        assert!(result.removed.contains(&a.task.id));
        assert!(result.removed.contains(&b.task.id));
        assert!(scheduler.get(a.task.id).await.is_none());
    }

    #[tokio::test]
    async fn invalid_cleaning_strategy_is_rejected() {
        let (scheduler, _dir) = test_scheduler().await;
        let err = scheduler.clean(spec("nope", json!({}))).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCleaningStrategy(_)));
    }

    #[tokio::test]
    async fn restore_fails_interrupted_running_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("state.json");

        let id = Uuid::new_v4();
        let task = Task {
            id,
            operation: spec("test", json!({})),
            condition: spec("now", json!({})),
            dependencies: HashMap::new(),
        };
        let mut state = State::default();
        state.tasks.running.insert(
            id,
            crate::models::task::RunningTask {
                task,
                scheduled: common::time::naive_utc_now(),
                started: common::time::naive_utc_now(),
            },
        );
        state.statuses.insert(id, Status::Running);
        Store::new(store_path.clone()).save(&state).await.unwrap();

        let mut operations = OperationRegistry::new();
        operations.register("test", Arc::new(crate::registry::operations::test_op::TestOperation));
        let scheduler = Scheduler::restore(Store::new(store_path), conditions::build(), operations, cleaning::build())
            .await
            .unwrap();

        let record = scheduler.get(id).await.unwrap();
        match record {
            TaskRecord::Failed(failed) => assert_eq!(failed.error, "InterruptedByRestart"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
