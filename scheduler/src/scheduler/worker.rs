use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::time::naive_utc_now;

use crate::models::task::{CompletedTask, FailedTask, RunningTask, Status};
use crate::store::Store;

use super::{Inner, Scheduler};

async fn transition_to_running(inner: &mut Inner, store: &Store, id: Uuid) -> bool {
    let Some(pending) = inner.state.tasks.pending.remove(&id) else {
        return false;
    };
    let running = RunningTask { task: pending.task, scheduled: pending.scheduled, started: naive_utc_now() };
    inner.state.tasks.running.insert(id, running);
    inner.state.statuses.insert(id, Status::Running);
    store.save(&inner.state).await.expect("persisting scheduler state must not fail");
    true
}

async fn transition_to_completed(inner: &mut Inner, store: &Store, id: Uuid, result: Value) {
    let Some(running) = inner.state.tasks.running.remove(&id) else {
        return;
    };
    let completed = CompletedTask {
        task: running.task,
        scheduled: running.scheduled,
        started: running.started,
        completed: naive_utc_now(),
        result,
    };
    inner.state.tasks.completed.insert(id, completed);
    inner.state.statuses.insert(id, Status::Completed);
    store.save(&inner.state).await.expect("persisting scheduler state must not fail");
    if let Some(signal) = inner.signals.get(&id) {
        signal.notify_waiters();
    }
    inner.tokens.remove(&id);
}

async fn transition_to_failed(inner: &mut Inner, store: &Store, id: Uuid, error: String) {
    let now = naive_utc_now();
    let record = inner
        .state
        .tasks
        .pending
        .remove(&id)
        .map(|r| (r.task, r.scheduled, now))
        .or_else(|| inner.state.tasks.running.remove(&id).map(|r| (r.task, r.scheduled, r.started)));
    let Some((task, scheduled, started)) = record else {
        return;
    };
    let failed = FailedTask { task, scheduled, started, failed: now, error };
    inner.state.tasks.failed.insert(id, failed);
    inner.state.statuses.insert(id, Status::Failed);
    store.save(&inner.state).await.expect("persisting scheduler state must not fail");
    if let Some(signal) = inner.signals.get(&id) {
        signal.notify_waiters();
    }
    inner.tokens.remove(&id);
}

/// Drives a single task from `Pending` through to a terminal status:
/// waits on its condition, waits on its dependencies, then runs its
/// operation. Cancellation is cooperative: at every suspension point we
/// race the in-flight future against the task's token, and if the token
/// wins we simply return, since [Scheduler::cancel] has already made
/// and persisted the `Cancelled` transition by the time it trips the
/// token.
pub(super) async fn run(scheduler: Scheduler, id: Uuid, token: CancellationToken) {
    let snapshot = {
        let inner = scheduler.inner.lock().await;
        inner
            .state
            .tasks
            .pending
            .get(&id)
            .map(|p| (p.task.condition.clone(), p.task.operation.clone(), p.task.dependencies.clone()))
    };
    let Some((condition_spec, operation_spec, dependencies)) = snapshot else {
        return;
    };

    let Some(condition_impl) = scheduler.conditions.get(&condition_spec.kind) else {
        let mut inner = scheduler.inner.lock().await;
        transition_to_failed(&mut inner, &scheduler.store, id, format!("unregistered condition `{}`", condition_spec.kind))
            .await;
        return;
    };

    tokio::select! {
        _ = token.cancelled() => return,
        result = condition_impl.wait(&condition_spec.parameters) => {
            if let Err(err) = result {
                let mut inner = scheduler.inner.lock().await;
                transition_to_failed(&mut inner, &scheduler.store, id, format!("condition failed: {err}")).await;
                return;
            }
        }
    }

    enum Outcome<'a> {
        Failed,
        Ready(HashMap<String, Value>),
        Waiting(Vec<Pin<Box<dyn Future<Output = ()> + Send + 'a>>>),
    }

    let dependency_results = loop {
        let mut held_notifies: Vec<Arc<Notify>> = Vec::new();
        let outcome = {
            let mut inner = scheduler.inner.lock().await;
            let mut results = HashMap::new();
            let mut unsuccessful = None;

            for (name, dep_id) in &dependencies {
                match inner.state.statuses.get(dep_id).copied() {
                    Some(Status::Completed) => {
                        results.insert(name.clone(), inner.state.tasks.completed[dep_id].result.clone());
                    }
                    Some(Status::Cancelled) | Some(Status::Failed) => {
                        unsuccessful = Some(*dep_id);
                        break;
                    }
                    Some(Status::Pending) | Some(Status::Running) => {
                        let notify =
                            inner.signals.entry(*dep_id).or_insert_with(|| Arc::new(Notify::new())).clone();
                        held_notifies.push(notify);
                    }
                    None => {
                        unsuccessful = Some(*dep_id);
                        break;
                    }
                }
            }

            if let Some(dep_id) = unsuccessful {
                transition_to_failed(&mut inner, &scheduler.store, id, format!("UnsuccessfulDependency:{dep_id}"))
                    .await;
                Outcome::Failed
            } else if held_notifies.is_empty() {
                Outcome::Ready(results)
            } else {
                // Subscribe to every pending dependency's signal while the
                // state mutex is still held. `enable()` registers the
                // waiter immediately, the same as a first poll, so a
                // `notify_waiters()` racing with us dropping the guard
                // below cannot be missed.
                let mut waiting = Vec::with_capacity(held_notifies.len());
                for notify in &held_notifies {
                    let mut notified: Pin<Box<dyn Future<Output = ()> + Send + '_>> = Box::pin(notify.notified());
                    let _ = notified.as_mut().enable();
                    waiting.push(notified);
                }
                Outcome::Waiting(waiting)
            }
        };

        match outcome {
            Outcome::Failed => return,
            Outcome::Ready(results) => break results,
            Outcome::Waiting(futures) => {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = futures::future::select_all(futures) => {}
                }
            }
        }
    };

    {
        let mut inner = scheduler.inner.lock().await;
        if !transition_to_running(&mut inner, &scheduler.store, id).await {
            return;
        }
    }

    let Some(operation_impl) = scheduler.operations.get(&operation_spec.kind) else {
        let mut inner = scheduler.inner.lock().await;
        transition_to_failed(&mut inner, &scheduler.store, id, format!("unregistered operation `{}`", operation_spec.kind))
            .await;
        return;
    };

    let result = operation_impl.run(operation_spec.parameters, dependency_results, token.clone()).await;

    let mut inner = scheduler.inner.lock().await;
    if token.is_cancelled() {
        // `cancel()` already moved this task to `Cancelled` and fired its signal.
        return;
    }
    match result {
        Ok(value) => transition_to_completed(&mut inner, &scheduler.store, id, value).await,
        Err(err) => transition_to_failed(&mut inner, &scheduler.store, id, err.to_string()).await,
    }
}
