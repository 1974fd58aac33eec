//! Field and placement rules shared by the client board and the store

use uuid::Uuid;

use crate::tree::TaskTree;
use crate::{Error, Result};

/// Deepest allowed depth, 0-based (three levels: 0, 1, 2)
pub const MAX_DEPTH: usize = 2;
/// Number of levels a tree may have
pub const MAX_LEVELS: usize = MAX_DEPTH + 1;
pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;

/// Validate a task title and return its trimmed form
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Task title cannot be empty".to_string()));
    }
    let len = trimmed.chars().count();
    if len < TITLE_MIN {
        return Err(Error::Validation(format!(
            "Task title must be at least {} characters",
            TITLE_MIN
        )));
    }
    if len > TITLE_MAX {
        return Err(Error::Validation(format!(
            "Task title must be at most {} characters",
            TITLE_MAX
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate an optional description; blank descriptions become `None`
pub fn validate_description(description: Option<&str>) -> Result<Option<String>> {
    let Some(description) = description else {
        return Ok(None);
    };
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > DESCRIPTION_MAX {
        return Err(Error::Validation(format!(
            "Task description must be at most {} characters",
            DESCRIPTION_MAX
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Check that a task titled `title` may live under `parent_id` in `tree`.
///
/// `exclude` skips one task in the sibling check (the task being moved).
pub fn check_placement(
    tree: &TaskTree,
    parent_id: Option<Uuid>,
    title: &str,
    exclude: Option<Uuid>,
) -> Result<()> {
    if let Some(parent_id) = parent_id {
        if tree.get(parent_id).is_none() {
            return Err(Error::Validation(
                "Parent task must be in the same list".to_string(),
            ));
        }
        if tree.depth_of(parent_id) >= MAX_DEPTH {
            return Err(Error::Validation(format!(
                "Max depth ({}) reached",
                MAX_LEVELS
            )));
        }
    }

    if tree.has_sibling_titled(parent_id, title, exclude) {
        let message = if parent_id.is_some() {
            "A subtask with this name already exists at this level"
        } else {
            "A task with this name already exists in this list"
        };
        return Err(Error::Conflict(message.to_string()));
    }

    Ok(())
}
