//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(alias = "todo")]
    Todo,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    #[serde(alias = "done")]
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        self == Self::Done
    }

    /// The status a checkbox toggle moves to.
    pub fn toggled(self) -> Self {
        match self {
            Self::Done => Self::Todo,
            Self::Todo | Self::InProgress => Self::Done,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task in a todo list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub list_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new top-level task in the given list
    pub fn new(list_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            list_id,
            parent_id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the parent task
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
}

/// Nested wire form of a task, as returned when listing a list's tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: Uuid,
    pub list_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub subtasks: Vec<TaskNode>,
}

impl TaskNode {
    pub fn from_task(task: Task, subtasks: Vec<TaskNode>) -> Self {
        Self {
            id: task.id,
            list_id: task.list_id,
            parent_id: task.parent_id,
            title: task.title,
            description: task.description,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
            subtasks,
        }
    }

    /// Split into the flat task and its direct subtasks
    pub fn into_parts(self) -> (Task, Vec<TaskNode>) {
        let task = Task {
            id: self.id,
            list_id: self.list_id,
            parent_id: self.parent_id,
            title: self.title,
            description: self.description,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (task, self.subtasks)
    }
}

/// Payload for creating a task or subtask
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub list_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

impl NewTask {
    pub fn new(list_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            list_id,
            parent_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Body of a status update
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: TaskStatus,
}

/// Destination of a move: a list, and optionally a parent inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub list_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_task() {
        let list_id = Uuid::new_v4();
        let task = Task::new(list_id, "Test task");
        assert_eq!(task.title, "Test task");
        assert_eq!(task.list_id, list_id);
        assert!(task.parent_id.is_none());
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.description.is_none());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let parsed: TaskStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(parsed, TaskStatus::InProgress);
        let parsed: TaskStatus = serde_json::from_str("\"Done\"").unwrap();
        assert_eq!(parsed, TaskStatus::Done);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(TaskStatus::Todo.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::InProgress.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.toggled(), TaskStatus::Todo);
    }

    #[test]
    fn test_node_parts() {
        let list_id = Uuid::new_v4();
        let parent = Task::new(list_id, "Parent");
        let child = Task::new(list_id, "Child").with_parent(parent.id);
        let node = TaskNode::from_task(
            parent.clone(),
            vec![TaskNode::from_task(child.clone(), Vec::new())],
        );

        let (task, subtasks) = node.into_parts();
        assert_eq!(task, parent);
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].id, child.id);
    }
}
