//! REST client for the todo API server

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AuthApi, TodoApi};
use crate::list::{NewList, TodoList};
use crate::task::{MoveRequest, NewTask, StatusUpdate, Task, TaskNode, TaskStatus};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP implementation of [`TodoApi`] and [`AuthApi`]
pub struct HttpTodoApi {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpTodoApi {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:5000`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    /// Reuse a bearer token from an earlier login
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Check whether the current token is accepted by probing a protected
    /// endpoint; the server has no "current user" route.
    pub async fn probe_session(&self) -> Result<bool> {
        match self.list_lists().await {
            Ok(_) => Ok(true),
            Err(Error::Unauthenticated) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        debug!("Server answered {}: {}", status, message);
        Err(error_from_status(status, message))
    }

    async fn send_json<T>(&self, request: RequestBuilder) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("Invalid response body: {}", e)))
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub(crate) fn error_from_status(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthenticated,
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        other => Error::Transport(format!("Server error {}: {}", other, message)),
    }
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list_tasks(&self, list_id: Uuid) -> Result<Vec<TaskNode>> {
        let path = format!("/api/todos/tasks/{}", list_id);
        self.send_json(self.client.get(self.url(&path))).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        self.send_json(self.client.post(self.url("/api/todos/task")).json(&task))
            .await
    }

    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<()> {
        let path = format!("/api/todos/task/{}/status", task_id);
        self.send(
            self.client
                .patch(self.url(&path))
                .json(&StatusUpdate { status }),
        )
        .await?;
        Ok(())
    }

    async fn move_task(&self, task_id: Uuid, target: MoveRequest) -> Result<()> {
        let path = format!("/api/todos/task/{}/move", task_id);
        self.send(self.client.patch(self.url(&path)).json(&target))
            .await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        let path = format!("/api/todos/task/{}", task_id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }

    async fn create_list(&self, title: &str) -> Result<TodoList> {
        let body = NewList {
            title: title.to_string(),
        };
        self.send_json(self.client.post(self.url("/api/todos/list")).json(&body))
            .await
    }

    async fn list_lists(&self) -> Result<Vec<TodoList>> {
        self.send_json(self.client.get(self.url("/api/todos/lists")))
            .await
    }

    async fn delete_list(&self, list_id: Uuid) -> Result<()> {
        let path = format!("/api/todos/list/{}", list_id);
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for HttpTodoApi {
    async fn register(&self, username: &str, password: &str) -> Result<()> {
        let body = Credentials { username, password };
        self.send(self.client.post(self.url("/api/auth/register")).json(&body))
            .await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let body = Credentials { username, password };
        let response: LoginResponse = self
            .send_json(self.client.post(self.url("/api/auth/login")).json(&body))
            .await?;
        self.set_token(Some(response.token)).await;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let result = self
            .send(self.client.post(self.url("/api/auth/logout")))
            .await;
        self.set_token(None).await;
        match result {
            Ok(_) | Err(Error::Unauthenticated) => Ok(()),
            Err(err) => {
                warn!("Logout request failed: {}", err);
                Err(err)
            }
        }
    }
}
