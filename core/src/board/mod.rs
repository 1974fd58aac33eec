//! Task board for the list being viewed
//!
//! Owns the in-memory [`TaskTree`] of one list and routes user actions
//! through the status cascade and the move operator. Every status step is
//! persisted and confirmed before the next one is issued; structural changes
//! re-sync the tree from the store once they succeed.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::TodoApi;
use crate::mover::{parent_options, validate_move, MoveMode, ParentOption};
use crate::status::{
    offers_descendant_reopen, plan_status_change, InFlight, StatusChange,
};
use crate::task::{
    check_placement, validate_description, validate_title, NewTask, Task, TaskStatus,
};
use crate::tree::{TaskSummary, TaskTree};
use crate::{Error, Result};

/// Answers "also reopen all subtasks?" when a task with Done children is
/// set back to Todo
pub trait ReopenPrompt: Send + Sync {
    fn confirm_reopen(&self, task: &Task) -> bool;
}

impl<F> ReopenPrompt for F
where
    F: Fn(&Task) -> bool + Send + Sync,
{
    fn confirm_reopen(&self, task: &Task) -> bool {
        self(task)
    }
}

/// Fixed answer to the reopen question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReopenDescendants {
    Always,
    Never,
}

impl ReopenPrompt for ReopenDescendants {
    fn confirm_reopen(&self, _task: &Task) -> bool {
        matches!(self, Self::Always)
    }
}

/// Result of a status request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Every listed change was persisted, in order
    Applied(Vec<StatusChange>),
    /// The task already had the requested status
    Unchanged,
    /// Another request for the same task was still in flight
    Dropped,
}

impl StatusOutcome {
    pub fn changes(&self) -> &[StatusChange] {
        match self {
            Self::Applied(changes) => changes,
            Self::Unchanged | Self::Dropped => &[],
        }
    }
}

pub struct TaskBoard<A: ?Sized> {
    api: Arc<A>,
    list_id: Uuid,
    tree: RwLock<TaskTree>,
    in_flight: InFlight,
}

impl<A> TaskBoard<A>
where
    A: TodoApi + ?Sized,
{
    /// Load `list_id` and start tracking it
    pub async fn open(api: Arc<A>, list_id: Uuid) -> Result<Self> {
        let tree = TaskTree::load(api.as_ref(), list_id).await?;
        Ok(Self {
            api,
            list_id,
            tree: RwLock::new(tree),
            in_flight: InFlight::new(),
        })
    }

    pub fn list_id(&self) -> Uuid {
        self.list_id
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Replace the tree with the store's current version
    pub async fn refresh(&self) -> Result<()> {
        let tree = TaskTree::load(self.api.as_ref(), self.list_id).await?;
        *self.tree.write().await = tree;
        Ok(())
    }

    pub async fn snapshot(&self) -> TaskTree {
        self.tree.read().await.clone()
    }

    pub async fn summary(&self) -> TaskSummary {
        self.tree.read().await.count_summary()
    }

    /// Flip a task between Todo and Done (InProgress counts as not done)
    pub async fn toggle(&self, task_id: Uuid, prompt: &dyn ReopenPrompt) -> Result<StatusOutcome> {
        let current = self
            .tree
            .read()
            .await
            .get(task_id)
            .map(|task| task.status)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        self.set_status(task_id, current.toggled(), prompt).await
    }

    /// Move a task to `to`, cascading to ancestors and (on confirmation)
    /// descendants.
    ///
    /// A guard violation is returned before anything is persisted. If a later
    /// cascade step fails, the steps already confirmed stay applied and
    /// [`Error::CascadeInterrupted`] reports how far it got.
    pub async fn set_status(
        &self,
        task_id: Uuid,
        to: TaskStatus,
        prompt: &dyn ReopenPrompt,
    ) -> Result<StatusOutcome> {
        let Some(_token) = self.in_flight.try_acquire(task_id) else {
            debug!("Status change for {} already in flight, dropping", task_id);
            return Ok(StatusOutcome::Dropped);
        };

        let plan = {
            let tree = self.tree.read().await;
            let task = tree
                .get(task_id)
                .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
            let reopen = offers_descendant_reopen(&tree, task, to) && prompt.confirm_reopen(task);
            plan_status_change(&tree, task_id, to, reopen)?
        };
        if plan.is_empty() {
            return Ok(StatusOutcome::Unchanged);
        }

        self.apply_plan(&plan).await?;
        info!(
            "Task {} set to {} with {} cascaded changes",
            task_id,
            to,
            plan.len() - 1
        );
        Ok(StatusOutcome::Applied(plan))
    }

    async fn apply_plan(&self, plan: &[StatusChange]) -> Result<()> {
        let total = plan.len();
        for (applied, change) in plan.iter().enumerate() {
            if let Err(source) = self.api.update_status(change.task_id, change.to).await {
                warn!(
                    "Status update for {} failed after {} of {} steps: {}",
                    change.task_id, applied, total, source
                );
                if applied == 0 {
                    return Err(source);
                }
                return Err(Error::CascadeInterrupted {
                    applied,
                    total,
                    source: Box::new(source),
                });
            }
            self.tree
                .write()
                .await
                .set_status(change.task_id, change.to);
        }
        Ok(())
    }

    /// Create a task, or a subtask when `parent_id` is set.
    ///
    /// A Done parent (and any Done ancestor above it) is reopened first, and
    /// the subtask starts as Todo. Fails with [`Error::Conflict`] while a
    /// status change on the parent is in flight.
    pub async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> Result<Task> {
        let title = validate_title(title)?;
        let description = validate_description(description)?;

        // Holds off status changes on the parent until the subtask exists
        let _parent_token = match parent_id {
            Some(parent_id) => Some(self.in_flight.try_acquire(parent_id).ok_or_else(|| {
                Error::Conflict("The parent task is still being updated".to_string())
            })?),
            None => None,
        };

        let reopen_plan = {
            let tree = self.tree.read().await;
            check_placement(&tree, parent_id, &title, None)?;
            match parent_id.and_then(|id| tree.get(id)) {
                Some(parent) if parent.status.is_done() => {
                    plan_status_change(&tree, parent.id, TaskStatus::Todo, false)?
                }
                _ => Vec::new(),
            }
        };
        if !reopen_plan.is_empty() {
            debug!("Reopening {} tasks before adding a subtask", reopen_plan.len());
            self.apply_plan(&reopen_plan).await?;
        }

        let mut new_task = NewTask::new(self.list_id, title);
        new_task.description = description;
        new_task.parent_id = parent_id;
        let task = self.api.create_task(new_task).await?;
        self.refresh().await?;
        Ok(task)
    }

    /// Delete a task and its subtree
    pub async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        if self.tree.read().await.get(task_id).is_none() {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        self.api.delete_task(task_id).await?;
        self.refresh().await
    }

    async fn destination_tree(&self, list_id: Uuid) -> Result<TaskTree> {
        if list_id == self.list_id {
            Ok(self.snapshot().await)
        } else {
            TaskTree::load(self.api.as_ref(), list_id).await
        }
    }

    /// Parents `task_id` may be moved under in `list_id`
    pub async fn parent_options(&self, task_id: Uuid, list_id: Uuid) -> Result<Vec<ParentOption>> {
        let target = self.destination_tree(list_id).await?;
        let source = self.tree.read().await;
        parent_options(&source, task_id, &target)
    }

    /// Validate and persist a move; the tree is only re-synced on success.
    pub async fn move_task(&self, task_id: Uuid, mode: MoveMode) -> Result<()> {
        let target = self.destination_tree(mode.target_list()).await?;
        let request = {
            let source = self.tree.read().await;
            validate_move(&source, task_id, &target, mode)?
        };

        self.api.move_task(task_id, request).await?;
        info!("Moved task {} to list {}", task_id, request.list_id);
        self.refresh().await
    }
}
