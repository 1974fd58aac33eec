//! Task endpoints
//!
//! The store re-checks every tree rule here, whatever the client already
//! validated.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use todo_core::task::{MoveRequest, NewTask, StatusUpdate, Task, TaskNode, TaskStatus};

use super::auth::require_session;
use super::{map_core_error, RouteError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct StatusResponse {
    message: String,
    task_id: Uuid,
    new_status: TaskStatus,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    message: String,
    deleted: usize,
}

/// POST /api/todos/task - Create a task or subtask
async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), RouteError> {
    let session = require_session(&state, &headers).await?;
    let task = state
        .todo_store()
        .create_task(session.user.id, req)
        .await
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/todos/tasks/{list_id} - Nested task tree of a list
async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(list_id): Path<Uuid>,
) -> Result<Json<Vec<TaskNode>>, RouteError> {
    let session = require_session(&state, &headers).await?;
    let nodes = state
        .todo_store()
        .list_tasks(session.user.id, list_id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(nodes))
}

/// PATCH /api/todos/task/{id}/status - Persist one status change
async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<StatusResponse>, RouteError> {
    let session = require_session(&state, &headers).await?;
    let task = state
        .todo_store()
        .update_status(session.user.id, id, req.status)
        .await
        .map_err(map_core_error)?;
    Ok(Json(StatusResponse {
        message: "Task status updated".to_string(),
        task_id: task.id,
        new_status: task.status,
    }))
}

/// PATCH /api/todos/task/{id}/move - Re-home a task with its subtree
async fn move_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Task>, RouteError> {
    let session = require_session(&state, &headers).await?;
    let task = state
        .todo_store()
        .move_task(session.user.id, id, req)
        .await
        .map_err(map_core_error)?;
    Ok(Json(task))
}

/// DELETE /api/todos/task/{id} - Delete a task and its descendants
async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, RouteError> {
    let session = require_session(&state, &headers).await?;
    let deleted = state
        .todo_store()
        .delete_task(session.user.id, id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(DeleteResponse {
        message: "Task deleted successfully".to_string(),
        deleted,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/todos/task", post(create_task))
        .route("/api/todos/tasks/{list_id}", get(list_tasks))
        .route("/api/todos/task/{id}/status", patch(update_status))
        .route("/api/todos/task/{id}/move", patch(move_task))
        .route("/api/todos/task/{id}", delete(delete_task))
}
