//! CRUD interface to the backing store
//!
//! The core components only ever talk to persistence through these traits.
//! [`HttpTodoApi`] implements them over the REST API; the file store's
//! [`ScopedTodoStore`](crate::store::ScopedTodoStore) implements them
//! in-process.

mod http;

use async_trait::async_trait;
use uuid::Uuid;

use crate::list::TodoList;
use crate::task::{MoveRequest, NewTask, Task, TaskNode, TaskStatus};
use crate::Result;

pub use http::HttpTodoApi;

/// Task and list operations for the signed-in user
#[async_trait]
pub trait TodoApi: Send + Sync {
    /// Full task tree of a list (top-level tasks with nested subtasks)
    async fn list_tasks(&self, list_id: Uuid) -> Result<Vec<TaskNode>>;

    /// Create a task or subtask
    async fn create_task(&self, task: NewTask) -> Result<Task>;

    /// Persist one status change
    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<()>;

    /// Re-home a task; the store cascades `list_id` to its descendants
    async fn move_task(&self, task_id: Uuid, target: MoveRequest) -> Result<()>;

    /// Delete a task and its descendants
    async fn delete_task(&self, task_id: Uuid) -> Result<()>;

    /// Create a list
    async fn create_list(&self, title: &str) -> Result<TodoList>;

    /// All lists of the user
    async fn list_lists(&self) -> Result<Vec<TodoList>>;

    /// Delete a list and all of its tasks
    async fn delete_list(&self, list_id: Uuid) -> Result<()>;
}

/// Opaque authentication service
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, username: &str, password: &str) -> Result<()>;

    async fn login(&self, username: &str, password: &str) -> Result<()>;

    async fn logout(&self) -> Result<()>;
}
