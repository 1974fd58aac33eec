//! File-based todo storage
//!
//! Stores every list and task as JSON in a single file on disk. Mutations are
//! staged on a copy of the state and only become visible once the file has
//! been rewritten, all under the write lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::list::{validate_list_title, TodoList};
use crate::mover::{validate_move, MoveMode};
use crate::status::check_transition;
use crate::task::{
    check_placement, validate_description, validate_title, MoveRequest, NewTask, Task, TaskNode,
    TaskStatus,
};
use crate::tree::TaskTree;
use crate::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTodoState {
    #[serde(default)]
    lists: Vec<TodoList>,
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Default, Clone)]
struct TodoState {
    lists: HashMap<Uuid, TodoList>,
    tasks: HashMap<Uuid, Task>,
}

impl TodoState {
    fn owned_list(&self, owner: Uuid, list_id: Uuid) -> Result<&TodoList> {
        self.lists
            .get(&list_id)
            .filter(|list| list.owner_id == owner)
            .ok_or_else(|| Error::ListNotFound(list_id.to_string()))
    }

    fn owned_task(&self, owner: Uuid, task_id: Uuid) -> Result<&Task> {
        self.tasks
            .get(&task_id)
            .filter(|task| {
                self.lists
                    .get(&task.list_id)
                    .is_some_and(|list| list.owner_id == owner)
            })
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    fn tree(&self, list_id: Uuid) -> TaskTree {
        TaskTree::from_tasks(
            list_id,
            self.tasks
                .values()
                .filter(|task| task.list_id == list_id)
                .cloned(),
        )
    }
}

/// JSON-file backed authority of record for lists and tasks.
///
/// Every operation takes the id of the acting user; records owned by someone
/// else are reported as not found.
pub struct FileTodoStore {
    path: PathBuf,
    state: RwLock<TodoState>,
}

impl FileTodoStore {
    /// Open the store at `path`.
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let stored: StoredTodoState = serde_json::from_str(&content)?;
            TodoState {
                lists: stored.lists.into_iter().map(|l| (l.id, l)).collect(),
                tasks: stored.tasks.into_iter().map(|t| (t.id, t)).collect(),
            }
        } else {
            TodoState::default()
        };
        debug!(
            "Loaded {} lists and {} tasks from {}",
            state.lists.len(),
            state.tasks.len(),
            path.display()
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &TodoState) -> Result<()> {
        let mut lists: Vec<&TodoList> = state.lists.values().collect();
        lists.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let mut tasks: Vec<&Task> = state.tasks.values().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let content = serde_json::to_string_pretty(&serde_json::json!({
            "lists": lists,
            "tasks": tasks,
        }))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Write `next` to disk, then make it the live state
    async fn commit(&self, state: &mut TodoState, next: TodoState) -> Result<()> {
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    pub async fn create_list(&self, owner: Uuid, title: &str) -> Result<TodoList> {
        let title = validate_list_title(title)?;
        let mut state = self.state.write().await;
        let wanted = title.to_lowercase();
        if state
            .lists
            .values()
            .any(|l| l.owner_id == owner && l.title.to_lowercase() == wanted)
        {
            return Err(Error::Conflict(
                "A list with this name already exists".to_string(),
            ));
        }

        let list = TodoList::new(owner, title);
        let mut next = state.clone();
        next.lists.insert(list.id, list.clone());
        self.commit(&mut state, next).await?;
        info!("Created list {} for user {}", list.id, owner);
        Ok(list)
    }

    /// Lists of `owner`, oldest first
    pub async fn lists(&self, owner: Uuid) -> Result<Vec<TodoList>> {
        let state = self.state.read().await;
        let mut lists: Vec<TodoList> = state
            .lists
            .values()
            .filter(|l| l.owner_id == owner)
            .cloned()
            .collect();
        lists.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(lists)
    }

    /// Delete a list together with all of its tasks
    pub async fn delete_list(&self, owner: Uuid, list_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.owned_list(owner, list_id)?;

        let mut next = state.clone();
        next.lists.remove(&list_id);
        next.tasks.retain(|_, task| task.list_id != list_id);
        let removed = state.tasks.len() - next.tasks.len();
        self.commit(&mut state, next).await?;
        info!("Deleted list {} and {} tasks", list_id, removed);
        Ok(())
    }

    pub async fn task_tree(&self, owner: Uuid, list_id: Uuid) -> Result<TaskTree> {
        let state = self.state.read().await;
        state.owned_list(owner, list_id)?;
        Ok(state.tree(list_id))
    }

    /// Nested task tree of a list, siblings in creation order
    pub async fn list_tasks(&self, owner: Uuid, list_id: Uuid) -> Result<Vec<TaskNode>> {
        Ok(self.task_tree(owner, list_id).await?.to_nodes())
    }

    pub async fn get_task(&self, owner: Uuid, task_id: Uuid) -> Result<Task> {
        let state = self.state.read().await;
        state.owned_task(owner, task_id).cloned()
    }

    pub async fn create_task(&self, owner: Uuid, new_task: NewTask) -> Result<Task> {
        let title = validate_title(&new_task.title)?;
        let description = validate_description(new_task.description.as_deref())?;

        let mut state = self.state.write().await;
        state.owned_list(owner, new_task.list_id)?;
        let tree = state.tree(new_task.list_id);
        check_placement(&tree, new_task.parent_id, &title, None)?;
        if let Some(parent) = new_task.parent_id.and_then(|id| tree.get(id)) {
            if parent.status.is_done() && !new_task.status.is_done() {
                return Err(Error::Validation(
                    "Reopen the parent task before adding a subtask".to_string(),
                ));
            }
        }

        let mut task = Task::new(new_task.list_id, title).with_status(new_task.status);
        task.parent_id = new_task.parent_id;
        task.description = description;
        let mut next = state.clone();
        next.tasks.insert(task.id, task.clone());
        self.commit(&mut state, next).await?;
        info!("Created task {} in list {}", task.id, task.list_id);
        Ok(task)
    }

    /// Persist one status transition, enforcing the completion invariant
    pub async fn update_status(&self, owner: Uuid, task_id: Uuid, status: TaskStatus) -> Result<Task> {
        let mut state = self.state.write().await;
        let list_id = state.owned_task(owner, task_id)?.list_id;
        check_transition(&state.tree(list_id), task_id, status)?;

        let current = state.owned_task(owner, task_id)?;
        if current.status == status {
            return Ok(current.clone());
        }

        let mut next = state.clone();
        let task = next
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let from = task.status;
        task.status = status;
        task.updated_at = Utc::now();
        let task = task.clone();
        self.commit(&mut state, next).await?;
        debug!("Task {} status {} -> {}", task_id, from, status);
        Ok(task)
    }

    /// Re-home a task and carry its descendants' `list_id` along
    pub async fn move_task(&self, owner: Uuid, task_id: Uuid, target: MoveRequest) -> Result<Task> {
        let mut state = self.state.write().await;
        let source_list = state.owned_task(owner, task_id)?.list_id;
        state.owned_list(owner, target.list_id)?;

        let source = state.tree(source_list);
        let destination = if target.list_id == source_list {
            source.clone()
        } else {
            state.tree(target.list_id)
        };
        let mode = MoveMode::ToParent {
            list_id: target.list_id,
            parent_id: target.parent_id,
        };
        let request = validate_move(&source, task_id, &destination, mode)?;

        let now = Utc::now();
        let moved = source.subtree_ids(task_id);
        let mut next = state.clone();
        for id in &moved {
            if let Some(task) = next.tasks.get_mut(id) {
                task.list_id = request.list_id;
                task.updated_at = now;
            }
        }
        let task = next
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        task.parent_id = request.parent_id;
        let task = task.clone();

        self.commit(&mut state, next).await?;
        info!(
            "Moved task {} ({} records) to list {} under {:?}",
            task_id,
            moved.len(),
            request.list_id,
            request.parent_id
        );
        Ok(task)
    }

    /// Delete a task and its descendants; returns the number removed
    pub async fn delete_task(&self, owner: Uuid, task_id: Uuid) -> Result<usize> {
        let mut state = self.state.write().await;
        let list_id = state.owned_task(owner, task_id)?.list_id;
        let doomed = state.tree(list_id).subtree_ids(task_id);
        let mut next = state.clone();
        next.tasks.retain(|id, _| !doomed.contains(id));
        self.commit(&mut state, next).await?;
        info!("Deleted task {} with {} descendants", task_id, doomed.len() - 1);
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (FileTodoStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todos.json");
        let store = FileTodoStore::new(&path).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_list_lists() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();

        store.create_list(owner, "Home").await.unwrap();
        store.create_list(owner, "Work").await.unwrap();
        store.create_list(Uuid::new_v4(), "Home").await.unwrap();

        let lists = store.lists(owner).await.unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].title, "Home");

        let dup = store.create_list(owner, " home ").await.unwrap_err();
        assert!(matches!(dup, Error::Conflict(_)));
        assert!(matches!(
            store.create_list(owner, "  ").await,
            Err(Error::Validation(msg)) if msg == "Missing title"
        ));
    }

    #[tokio::test]
    async fn test_other_users_lists_are_not_found() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let list = store.create_list(owner, "Private").await.unwrap();
        let task = store
            .create_task(owner, NewTask::new(list.id, "Secret task"))
            .await
            .unwrap();

        assert!(matches!(
            store.list_tasks(stranger, list.id).await,
            Err(Error::ListNotFound(_))
        ));
        assert!(matches!(
            store.update_status(stranger, task.id, TaskStatus::Done).await,
            Err(Error::TaskNotFound(_))
        ));
        assert!(store.delete_list(stranger, list.id).await.is_err());
    }

    #[tokio::test]
    async fn test_create_task_rules() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let list = store.create_list(owner, "Home").await.unwrap();

        let a = store
            .create_task(owner, NewTask::new(list.id, "Level zero").with_description("  "))
            .await
            .unwrap();
        assert_eq!(a.description, None);
        let b = store
            .create_task(owner, NewTask::new(list.id, "Level one").with_parent(a.id))
            .await
            .unwrap();
        let c = store
            .create_task(owner, NewTask::new(list.id, "Level two").with_parent(b.id))
            .await
            .unwrap();

        let too_deep = store
            .create_task(owner, NewTask::new(list.id, "Level three").with_parent(c.id))
            .await
            .unwrap_err();
        assert!(matches!(too_deep, Error::Validation(msg) if msg.contains("Max depth")));

        let dup = store
            .create_task(owner, NewTask::new(list.id, "LEVEL ONE").with_parent(a.id))
            .await
            .unwrap_err();
        assert!(matches!(dup, Error::Conflict(_)));

        // Same title is fine at a different level
        store
            .create_task(owner, NewTask::new(list.id, "Level one"))
            .await
            .unwrap();

        assert!(matches!(
            store.create_task(owner, NewTask::new(list.id, "ab")).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_status_invariant_is_enforced() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let list = store.create_list(owner, "Home").await.unwrap();
        let parent = store
            .create_task(owner, NewTask::new(list.id, "Parent task"))
            .await
            .unwrap();
        let child = store
            .create_task(owner, NewTask::new(list.id, "Child task").with_parent(parent.id))
            .await
            .unwrap();

        assert!(store
            .update_status(owner, parent.id, TaskStatus::Done)
            .await
            .is_err());
        store
            .update_status(owner, child.id, TaskStatus::Done)
            .await
            .unwrap();
        store
            .update_status(owner, parent.id, TaskStatus::Done)
            .await
            .unwrap();

        assert!(store
            .update_status(owner, child.id, TaskStatus::Todo)
            .await
            .is_err());
        let late = store
            .create_task(owner, NewTask::new(list.id, "Late child").with_parent(parent.id))
            .await
            .unwrap_err();
        assert!(matches!(late, Error::Validation(_)));

        store
            .update_status(owner, parent.id, TaskStatus::Todo)
            .await
            .unwrap();
        store
            .update_status(owner, child.id, TaskStatus::InProgress)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_cascades_list_id() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let first = store.create_list(owner, "First").await.unwrap();
        let second = store.create_list(owner, "Second").await.unwrap();
        let x = store
            .create_task(owner, NewTask::new(first.id, "Task X"))
            .await
            .unwrap();
        let x1 = store
            .create_task(owner, NewTask::new(first.id, "Task X1").with_parent(x.id))
            .await
            .unwrap();
        let w = store
            .create_task(owner, NewTask::new(second.id, "Task W"))
            .await
            .unwrap();
        let y = store
            .create_task(owner, NewTask::new(second.id, "Task Y").with_parent(w.id))
            .await
            .unwrap();

        let rejected = store
            .move_task(
                owner,
                x.id,
                MoveRequest {
                    list_id: second.id,
                    parent_id: Some(y.id),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(rejected, Error::Validation(_)));

        let moved = store
            .move_task(
                owner,
                x.id,
                MoveRequest {
                    list_id: second.id,
                    parent_id: Some(w.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.parent_id, Some(w.id));
        assert_eq!(store.get_task(owner, x1.id).await.unwrap().list_id, second.id);
        assert!(store.list_tasks(owner, first.id).await.unwrap().is_empty());

        let tree = store.task_tree(owner, second.id).await.unwrap();
        assert_eq!(tree.depth_of(x1.id), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let list = store.create_list(owner, "Home").await.unwrap();
        let a = store
            .create_task(owner, NewTask::new(list.id, "Task A"))
            .await
            .unwrap();
        let a1 = store
            .create_task(owner, NewTask::new(list.id, "Task A1").with_parent(a.id))
            .await
            .unwrap();
        store
            .create_task(owner, NewTask::new(list.id, "Task B"))
            .await
            .unwrap();

        assert_eq!(store.delete_task(owner, a.id).await.unwrap(), 2);
        assert!(matches!(
            store.get_task(owner, a1.id).await,
            Err(Error::TaskNotFound(_))
        ));

        store.delete_list(owner, list.id).await.unwrap();
        assert!(store.lists(owner).await.unwrap().is_empty());
        assert!(store.list_tasks(owner, list.id).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_state() {
        let (store, temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let list = store.create_list(owner, "Home").await.unwrap();
        let parent = store
            .create_task(owner, NewTask::new(list.id, "Parent task"))
            .await
            .unwrap();
        let child = store
            .create_task(owner, NewTask::new(list.id, "Child task").with_parent(parent.id))
            .await
            .unwrap();

        // A directory in place of the data file makes every write fail
        let path = temp.path().join("todos.json");
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();

        assert!(matches!(
            store.update_status(owner, child.id, TaskStatus::Done).await,
            Err(Error::Io(_))
        ));
        assert_eq!(
            store.get_task(owner, child.id).await.unwrap().status,
            TaskStatus::Todo
        );

        assert!(store.create_list(owner, "Work").await.is_err());
        assert_eq!(store.lists(owner).await.unwrap().len(), 1);

        assert!(store
            .create_task(owner, NewTask::new(list.id, "Never stored"))
            .await
            .is_err());
        assert!(store
            .move_task(
                owner,
                child.id,
                MoveRequest {
                    list_id: list.id,
                    parent_id: None,
                },
            )
            .await
            .is_err());
        assert!(store.delete_task(owner, parent.id).await.is_err());
        assert!(store.delete_list(owner, list.id).await.is_err());

        let tree = store.task_tree(owner, list.id).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.find_parent(child.id).unwrap().id, parent.id);
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("todos.json");
        let owner = Uuid::new_v4();

        let (list_id, task_id) = {
            let store = FileTodoStore::new(&path).await.unwrap();
            let list = store.create_list(owner, "Persistent").await.unwrap();
            let task = store
                .create_task(
                    owner,
                    NewTask::new(list.id, "Survives reload").with_description("Still here"),
                )
                .await
                .unwrap();
            (list.id, task.id)
        };

        let store = FileTodoStore::new(&path).await.unwrap();
        let nodes = store.list_tasks(owner, list_id).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, task_id);
        assert_eq!(nodes[0].description.as_deref(), Some("Still here"));
    }
}
