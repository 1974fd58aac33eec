use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{route_error, MessageResponse, RouteError};
use crate::{
    auth::{AuthError, AuthSession, UserSummary},
    state::AppState,
};

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    message: String,
    user: UserSummary,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    message: String,
    token: String,
    expires_at: String,
    user: UserSummary,
}

pub fn map_auth_error(err: AuthError) -> RouteError {
    match err {
        AuthError::InvalidInput(message) => route_error(StatusCode::BAD_REQUEST, message),
        AuthError::Unauthorized(message) => route_error(StatusCode::UNAUTHORIZED, message),
        AuthError::Conflict(message) => route_error(StatusCode::CONFLICT, message),
        AuthError::Storage(message) => {
            tracing::error!("Auth storage failure: {}", message);
            route_error(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller from the `Authorization: Bearer` header
pub async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<AuthSession, RouteError> {
    let token = bearer_token(headers)
        .ok_or_else(|| route_error(StatusCode::UNAUTHORIZED, "Authentication required"))?;
    state
        .auth_store()
        .authorize_bearer(token)
        .await
        .map_err(map_auth_error)
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), RouteError> {
    let user = state
        .auth_store()
        .register(&req.username, &req.password)
        .await
        .map_err(map_auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, RouteError> {
    let session = state
        .auth_store()
        .login(&req.username, &req.password)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(LoginResponse {
        message: "Logged in successfully".to_string(),
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
        user: session.user,
    }))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, RouteError> {
    let session = require_session(&state, &headers).await?;
    state
        .auth_store()
        .logout(&session)
        .await
        .map_err(map_auth_error)?;
    Ok(MessageResponse::new("Logged out"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{build_app, login_as, send};

    #[tokio::test]
    async fn register_and_login_return_token() {
        let (app, _tmp) = build_app().await;
        let credentials = json!({ "username": "frank", "password": "correct-horse" });

        let (status, payload) =
            send(&app, "POST", "/api/auth/register", None, Some(credentials.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(payload["user"]["username"], "frank");

        let (status, _) =
            send(&app, "POST", "/api/auth/register", None, Some(credentials.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, payload) = send(&app, "POST", "/api/auth/login", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(payload["token"].is_string());
        assert!(payload["expires_at"].is_string());
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected() {
        let (app, _tmp) = build_app().await;
        login_as(&app, "grace").await;

        let (status, payload) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "grace", "password": "wrong-horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(payload["error"], "Invalid credentials");

        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "", "password": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let (app, _tmp) = build_app().await;
        let token = login_as(&app, "heidi").await;

        let (status, _) = send(&app, "GET", "/api/todos/lists", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", "/api/todos/lists", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, "POST", "/api/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
