//! Status cascade planning
//!
//! Planning is pure: given a tree and a requested transition it returns the
//! ordered list of single-task changes to persist. Steps are ordered so the
//! completion invariant (a Done task has only Done children) holds after each
//! one: completions go bottom-up, reopened ancestors go top-down before the
//! requested task, and reopened descendants follow in pre-order.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::task::{Task, TaskStatus};
use crate::tree::TaskTree;
use crate::{Error, Result};

pub const COMPLETION_GUARD_MESSAGE: &str =
    "Complete all subtasks before marking this task as done";

/// Why a task's status is changing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// The change the caller asked for
    Requested,
    /// Every child is now Done
    ChildrenCompleted,
    /// A child left Done, so this ancestor must too
    ChildReopened,
    /// Reopened together with its ancestor on request
    AncestorReopened,
}

/// One persisted status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub task_id: Uuid,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub reason: ChangeReason,
}

/// Whether reopening `task` to `to` should ask about its descendants
pub fn offers_descendant_reopen(tree: &TaskTree, task: &Task, to: TaskStatus) -> bool {
    to == TaskStatus::Todo && tree.children(task.id).any(|child| child.status.is_done())
}

/// Plan every change implied by moving `task_id` to `to`.
///
/// An empty plan means the task already has that status.
pub fn plan_status_change(
    tree: &TaskTree,
    task_id: Uuid,
    to: TaskStatus,
    reopen_descendants: bool,
) -> Result<Vec<StatusChange>> {
    let task = tree
        .get(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

    if task.status == to {
        return Ok(Vec::new());
    }

    if to.is_done() {
        if !tree.all_children_done(task_id) {
            return Err(Error::Validation(COMPLETION_GUARD_MESSAGE.to_string()));
        }
        return Ok(plan_completion(tree, task));
    }

    Ok(plan_reopen(tree, task, to, reopen_descendants))
}

fn plan_completion(tree: &TaskTree, task: &Task) -> Vec<StatusChange> {
    let mut overrides: HashMap<Uuid, TaskStatus> = HashMap::new();
    let mut plan = vec![StatusChange {
        task_id: task.id,
        from: task.status,
        to: TaskStatus::Done,
        reason: ChangeReason::Requested,
    }];
    overrides.insert(task.id, TaskStatus::Done);

    let mut current = task.id;
    while let Some(parent) = tree.find_parent(current) {
        if parent.status.is_done() {
            break;
        }
        let siblings_done = tree.children(parent.id).all(|sibling| {
            overrides
                .get(&sibling.id)
                .copied()
                .unwrap_or(sibling.status)
                .is_done()
        });
        if !siblings_done {
            break;
        }
        plan.push(StatusChange {
            task_id: parent.id,
            from: parent.status,
            to: TaskStatus::Done,
            reason: ChangeReason::ChildrenCompleted,
        });
        overrides.insert(parent.id, TaskStatus::Done);
        current = parent.id;
    }

    plan
}

fn plan_reopen(
    tree: &TaskTree,
    task: &Task,
    to: TaskStatus,
    reopen_descendants: bool,
) -> Vec<StatusChange> {
    let mut ancestors = Vec::new();
    let mut current = task.id;
    while let Some(parent) = tree.find_parent(current) {
        if !parent.status.is_done() {
            break;
        }
        ancestors.push(StatusChange {
            task_id: parent.id,
            from: parent.status,
            to: TaskStatus::Todo,
            reason: ChangeReason::ChildReopened,
        });
        current = parent.id;
    }
    ancestors.reverse();

    let mut plan = ancestors;
    plan.push(StatusChange {
        task_id: task.id,
        from: task.status,
        to,
        reason: ChangeReason::Requested,
    });

    if reopen_descendants && to == TaskStatus::Todo {
        plan.extend(
            tree.descendants(task.id)
                .into_iter()
                .filter_map(|id| tree.get(id))
                .filter(|descendant| descendant.status.is_done())
                .map(|descendant| StatusChange {
                    task_id: descendant.id,
                    from: descendant.status,
                    to: TaskStatus::Todo,
                    reason: ChangeReason::AncestorReopened,
                }),
        );
    }

    plan
}

/// Check a single persisted transition against the completion invariant.
///
/// This is the store-side rule: Done needs all children Done, and a task
/// cannot leave Done while its parent is still Done.
pub fn check_transition(tree: &TaskTree, task_id: Uuid, to: TaskStatus) -> Result<()> {
    let task = tree
        .get(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    if task.status == to {
        return Ok(());
    }

    if to.is_done() {
        if !tree.all_children_done(task_id) {
            return Err(Error::Validation(COMPLETION_GUARD_MESSAGE.to_string()));
        }
    } else if tree.find_parent(task_id).is_some_and(|p| p.status.is_done()) {
        return Err(Error::Validation(
            "Reopen the parent task before reopening this subtask".to_string(),
        ));
    }

    Ok(())
}
