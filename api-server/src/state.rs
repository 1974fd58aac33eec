//! Application state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use todo_core::FileTodoStore;

use crate::auth::{AuthError, AuthStore};
use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("todo store: {0}")]
    Todo(#[from] todo_core::Error),
    #[error("auth store: {0}")]
    Auth(#[from] AuthError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    data_dir: PathBuf,
    todo_store: Arc<FileTodoStore>,
    auth_store: AuthStore,
}

impl AppState {
    /// Open the stores under the configured data directory
    pub async fn new(config: &ServerConfig) -> Result<Self, StateError> {
        let todo_store = FileTodoStore::new(config.todos_path()).await?;
        let auth_store = AuthStore::new(
            config.auth_dir(),
            config.jwt_secret.clone(),
            config.token_ttl_seconds,
        )
        .await?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                data_dir: config.data_dir.clone(),
                todo_store: Arc::new(todo_store),
                auth_store,
            }),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn todo_store(&self) -> &FileTodoStore {
        &self.inner.todo_store
    }

    pub fn auth_store(&self) -> &AuthStore {
        &self.inner.auth_store
    }
}
