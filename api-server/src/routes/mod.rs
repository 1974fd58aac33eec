//! Route handlers

pub mod auth;
pub mod health;
pub mod lists;
pub mod tasks;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Map a store failure onto an HTTP status and a message the client can show
pub fn map_core_error(err: todo_core::Error) -> RouteError {
    use todo_core::Error;

    match err {
        Error::Validation(message) => route_error(StatusCode::BAD_REQUEST, message),
        Error::Conflict(message) => route_error(StatusCode::CONFLICT, message),
        Error::TaskNotFound(_) => route_error(StatusCode::NOT_FOUND, "Task not found"),
        Error::ListNotFound(_) => route_error(StatusCode::NOT_FOUND, "List not found"),
        Error::NotFound(message) => route_error(StatusCode::NOT_FOUND, message),
        Error::Unauthenticated => route_error(StatusCode::UNAUTHORIZED, "Authentication required"),
        other => {
            error!("Request failed: {}", other);
            route_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

/// Full application router with CORS and request tracing
pub fn app(state: AppState, cors_permissive: bool) -> Router {
    let router = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(lists::router())
        .merge(tasks::router())
        .with_state(state);

    let router = if cors_permissive {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}
