//! Todo list model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const LIST_TITLE_MAX: usize = 100;

/// A todo list owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TodoList {
    pub fn new(owner_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// Body for creating a list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewList {
    pub title: String,
}

/// Validate a list title and return its trimmed form
pub fn validate_list_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Missing title".to_string()));
    }
    if trimmed.chars().count() > LIST_TITLE_MAX {
        return Err(Error::Validation(format!(
            "List title must be at most {} characters",
            LIST_TITLE_MAX
        )));
    }
    Ok(trimmed.to_string())
}
