use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::task::{CleanRequest, ScheduleRequest, Status, TaskIndex, TaskRecord};
use crate::server::state::ServerState;

use super::error::{ApiResult, Error};

pub fn routes(state: ServerState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(schedule_task))
        .route("/tasks/clean", post(clean_tasks))
        .route("/tasks/:id", get(get_task).delete(cancel_task))
        .route("/tasks/:status/:id", get(get_task_by_status))
        .with_state(state)
}

async fn list_tasks(State(state): State<ServerState>) -> Json<TaskIndex> {
    Json(state.scheduler.list().await)
}

async fn get_task(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<Json<TaskRecord>> {
    state
        .scheduler
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("task `{id}` does not exist")))
}

fn parse_status(raw: &str) -> Option<Status> {
    match raw {
        "pending" => Some(Status::Pending),
        "running" => Some(Status::Running),
        "cancelled" => Some(Status::Cancelled),
        "failed" => Some(Status::Failed),
        "completed" => Some(Status::Completed),
        _ => None,
    }
}

/// A status-scoped getter is a partition lookup, not an id lookup with a
/// status assertion: an id that exists but sits in a different
/// partition 404s exactly as if it didn't exist at all.
async fn get_task_by_status(
    State(state): State<ServerState>,
    Path((status, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<TaskRecord>> {
    let Some(status) = parse_status(&status) else {
        return Err(Error::NotFound(format!("no such task partition `{status}`")));
    };
    match state.scheduler.get(id).await {
        Some(record) if record.status() == status => Ok(Json(record)),
        _ => Err(Error::NotFound(format!("task `{id}` does not exist in partition `{status:?}`"))),
    }
}

async fn schedule_task(
    State(state): State<ServerState>,
    Json(request): Json<ScheduleRequest>,
) -> ApiResult<(StatusCode, Json<TaskRecord>)> {
    let record = state
        .scheduler
        .schedule(request.operation, request.condition, request.dependencies)
        .await?;
    Ok((StatusCode::CREATED, Json(TaskRecord::Pending(record))))
}

async fn cancel_task(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<Json<TaskRecord>> {
    let record = state.scheduler.cancel(id).await?;
    Ok(Json(TaskRecord::Cancelled(record)))
}

async fn clean_tasks(
    State(state): State<ServerState>,
    Json(request): Json<CleanRequest>,
) -> ApiResult<Json<crate::models::task::CleaningResult>> {
    let result = state.scheduler.clean(request.strategy).await?;
    Ok(Json(result))
}
