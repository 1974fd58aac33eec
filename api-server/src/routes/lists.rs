//! Todo list endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use todo_core::list::{NewList, TodoList};

use super::auth::require_session;
use super::{map_core_error, MessageResponse, RouteError};
use crate::state::AppState;

/// POST /api/todos/list - Create a list
async fn create_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewList>,
) -> Result<(StatusCode, Json<TodoList>), RouteError> {
    let session = require_session(&state, &headers).await?;
    let list = state
        .todo_store()
        .create_list(session.user.id, &req.title)
        .await
        .map_err(map_core_error)?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// GET /api/todos/lists - Lists of the caller
async fn list_lists(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TodoList>>, RouteError> {
    let session = require_session(&state, &headers).await?;
    let lists = state
        .todo_store()
        .lists(session.user.id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(lists))
}

/// DELETE /api/todos/list/{id} - Delete a list and its tasks
async fn delete_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, RouteError> {
    let session = require_session(&state, &headers).await?;
    state
        .todo_store()
        .delete_list(session.user.id, id)
        .await
        .map_err(map_core_error)?;
    Ok(MessageResponse::new("List deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/todos/list", post(create_list))
        .route("/api/todos/lists", get(list_lists))
        .route("/api/todos/list/{id}", delete(delete_list))
}
