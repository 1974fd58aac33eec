//! Error types for the core library

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("List not found: {0}")]
    ListNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to load tasks for list {list_id}: {source}")]
    Fetch {
        list_id: Uuid,
        #[source]
        source: Box<Error>,
    },

    #[error("Status cascade stopped after {applied} of {total} updates: {source}")]
    CascadeInterrupted {
        applied: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a failure should be handled by whoever surfaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client-correctable; show it, never retry.
    Validation,
    /// Stale reference; show it and re-fetch.
    NotFound,
    /// Network or server failure; show it, no automatic retry.
    Transport,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Conflict(_) => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::ListNotFound(_) | Self::NotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Fetch { source, .. } | Self::CascadeInterrupted { source, .. } => source.kind(),
            Self::Unauthenticated
            | Self::Transport(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Transport,
        }
    }

    /// True when the caller should go back to the login entry point.
    pub fn requires_login(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Fetch { source, .. } | Self::CascadeInterrupted { source, .. } => {
                source.requires_login()
            }
            _ => false,
        }
    }

    /// True when the local tree may no longer match the store.
    pub fn should_refetch(&self) -> bool {
        matches!(self, Self::CascadeInterrupted { .. }) || self.kind() == ErrorKind::NotFound
    }
}
