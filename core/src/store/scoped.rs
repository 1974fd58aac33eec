use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::FileTodoStore;
use crate::api::TodoApi;
use crate::list::TodoList;
use crate::task::{MoveRequest, NewTask, Task, TaskNode, TaskStatus};
use crate::Result;

/// A [`FileTodoStore`] acting on behalf of one user
#[derive(Clone)]
pub struct ScopedTodoStore {
    store: Arc<FileTodoStore>,
    owner: Uuid,
}

impl ScopedTodoStore {
    pub fn new(store: Arc<FileTodoStore>, owner: Uuid) -> Self {
        Self { store, owner }
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn store(&self) -> &Arc<FileTodoStore> {
        &self.store
    }
}

#[async_trait]
impl TodoApi for ScopedTodoStore {
    async fn list_tasks(&self, list_id: Uuid) -> Result<Vec<TaskNode>> {
        self.store.list_tasks(self.owner, list_id).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        self.store.create_task(self.owner, task).await
    }

    async fn update_status(&self, task_id: Uuid, status: TaskStatus) -> Result<()> {
        self.store.update_status(self.owner, task_id, status).await?;
        Ok(())
    }

    async fn move_task(&self, task_id: Uuid, target: MoveRequest) -> Result<()> {
        self.store.move_task(self.owner, task_id, target).await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        self.store.delete_task(self.owner, task_id).await?;
        Ok(())
    }

    async fn create_list(&self, title: &str) -> Result<TodoList> {
        self.store.create_list(self.owner, title).await
    }

    async fn list_lists(&self) -> Result<Vec<TodoList>> {
        self.store.lists(self.owner).await
    }

    async fn delete_list(&self, list_id: Uuid) -> Result<()> {
        self.store.delete_list(self.owner, list_id).await
    }
}
