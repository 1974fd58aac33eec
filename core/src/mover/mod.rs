//! Move/reparent operator
//!
//! Validates relocating a task (with its whole subtree) to another list or
//! under another parent. Validation never touches persistence; the caller
//! issues the single move call for the task's own record on success.

use serde::Serialize;
use uuid::Uuid;

use crate::task::{MoveRequest, MAX_DEPTH, MAX_LEVELS};
use crate::tree::TaskTree;
use crate::{Error, Result};

/// Where a task should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// Become a top-level task of another list
    ToList { list_id: Uuid },
    /// Take a new parent (or none) in `list_id`, which may be the current list
    ToParent {
        list_id: Uuid,
        parent_id: Option<Uuid>,
    },
}

impl MoveMode {
    pub fn target_list(&self) -> Uuid {
        match self {
            Self::ToList { list_id } | Self::ToParent { list_id, .. } => *list_id,
        }
    }

    pub fn target_parent(&self) -> Option<Uuid> {
        match self {
            Self::ToList { .. } => None,
            Self::ToParent { parent_id, .. } => *parent_id,
        }
    }
}

/// A selectable destination in a move dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParentOption {
    TopLevel,
    Task { id: Uuid, title: String, depth: usize },
}

/// Destinations in `target` that `task_id` (from `source`) may be moved under.
///
/// The task and its descendants are never offered, nor are parents that
/// would push the task's deepest descendant past the depth limit, nor Done
/// parents for a task that is not Done, nor parents that already hold a
/// subtask with the same title. "Top level" is offered unless a top-level
/// task there has the same title, so when nothing else qualifies it is the
/// only choice. Every option returned passes [`validate_move`].
pub fn parent_options(
    source: &TaskTree,
    task_id: Uuid,
    target: &TaskTree,
) -> Result<Vec<ParentOption>> {
    let task = source
        .get(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    let excluded = source.subtree_ids(task_id);
    let height = source.subtree_height(task_id);
    let own = (source.list_id() == target.list_id()).then_some(task_id);
    let clashes = |parent_id: Option<Uuid>| target.has_sibling_titled(parent_id, &task.title, own);

    let mut options = Vec::new();
    if !clashes(None) {
        options.push(ParentOption::TopLevel);
    }
    for candidate in target.preorder() {
        if excluded.contains(&candidate.id) {
            continue;
        }
        let depth = target.depth_of(candidate.id);
        if depth + 1 + height > MAX_DEPTH {
            continue;
        }
        if candidate.status.is_done() && !task.status.is_done() {
            continue;
        }
        if clashes(Some(candidate.id)) {
            continue;
        }
        options.push(ParentOption::Task {
            id: candidate.id,
            title: candidate.title.clone(),
            depth,
        });
    }

    Ok(options)
}

/// Validate a move and produce the request to persist.
///
/// `source` is the task's current list and `target` the destination list;
/// pass the same tree twice for a move within one list.
pub fn validate_move(
    source: &TaskTree,
    task_id: Uuid,
    target: &TaskTree,
    mode: MoveMode,
) -> Result<MoveRequest> {
    let task = source
        .get(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    if target.list_id() != mode.target_list() {
        return Err(Error::Validation(
            "Destination tree does not belong to the target list".to_string(),
        ));
    }
    let same_list = source.list_id() == target.list_id();

    if let MoveMode::ToList { list_id } = mode {
        if list_id == source.list_id() {
            return Err(Error::Validation(
                "Task is already in this list".to_string(),
            ));
        }
    }

    // Moving to the current place is accepted and leaves the task as it is
    let parent_id = mode.target_parent();
    if let Some(parent_id) = parent_id {
        if source.subtree_ids(task_id).contains(&parent_id) {
            return Err(Error::Validation(
                "Cannot move a task to be a child of itself or its descendants".to_string(),
            ));
        }
        let parent = target.get(parent_id).ok_or_else(|| {
            Error::Validation("Parent task must be in the target list".to_string())
        })?;
        let resulting = target.depth_of(parent_id) + 1 + source.subtree_height(task_id);
        if resulting > MAX_DEPTH {
            return Err(Error::Validation(format!(
                "Moving here would exceed the maximum of {} levels",
                MAX_LEVELS
            )));
        }
        if parent.status.is_done() && !task.status.is_done() {
            return Err(Error::Validation(
                "Cannot move an unfinished task under a completed task".to_string(),
            ));
        }
    }

    let exclude = same_list.then_some(task_id);
    if target.has_sibling_titled(parent_id, &task.title, exclude) {
        return Err(Error::Conflict(
            "A task with this name already exists at the destination".to_string(),
        ));
    }

    Ok(MoveRequest {
        list_id: target.list_id(),
        parent_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskStatus};

    fn titles(options: &[ParentOption]) -> Vec<String> {
        options
            .iter()
            .map(|o| match o {
                ParentOption::TopLevel => "<top>".to_string(),
                ParentOption::Task { title, .. } => title.clone(),
            })
            .collect()
    }

    /// List1: X ─ X1          List2: W ─ Y ─ Z
    struct Lists {
        list1: TaskTree,
        list2: TaskTree,
        x: Uuid,
        x1: Uuid,
        w: Uuid,
        y: Uuid,
    }

    fn lists() -> Lists {
        let l1 = Uuid::new_v4();
        let l2 = Uuid::new_v4();
        let x = Task::new(l1, "Task X");
        let x1 = Task::new(l1, "Task X1").with_parent(x.id);
        let w = Task::new(l2, "Task W");
        let y = Task::new(l2, "Task Y").with_parent(w.id);
        let z = Task::new(l2, "Task Z").with_parent(y.id);
        Lists {
            list1: TaskTree::from_tasks(l1, vec![x.clone(), x1.clone()]),
            list2: TaskTree::from_tasks(l2, vec![w.clone(), y.clone(), z]),
            x: x.id,
            x1: x1.id,
            w: w.id,
            y: y.id,
        }
    }

    #[test]
    fn test_cross_list_move_respects_subtree_depth() {
        let l = lists();
        let under_y = MoveMode::ToParent {
            list_id: l.list2.list_id(),
            parent_id: Some(l.y),
        };
        let err = validate_move(&l.list1, l.x, &l.list2, under_y).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("maximum")));

        let under_w = MoveMode::ToParent {
            list_id: l.list2.list_id(),
            parent_id: Some(l.w),
        };
        let request = validate_move(&l.list1, l.x, &l.list2, under_w).unwrap();
        assert_eq!(request.list_id, l.list2.list_id());
        assert_eq!(request.parent_id, Some(l.w));
    }

    #[test]
    fn test_options_exclude_too_deep_parents() {
        let l = lists();
        let options = parent_options(&l.list1, l.x, &l.list2).unwrap();
        assert_eq!(titles(&options), vec!["<top>", "Task W"]);

        // A leaf may go one level deeper
        let options = parent_options(&l.list1, l.x1, &l.list2).unwrap();
        assert_eq!(titles(&options), vec!["<top>", "Task W", "Task Y"]);
    }

    #[test]
    fn test_options_exclude_self_and_descendants() {
        let l = lists();
        let options = parent_options(&l.list1, l.x, &l.list1).unwrap();
        assert_eq!(options, vec![ParentOption::TopLevel]);
    }

    fn mode_for(target: &TaskTree, option: &ParentOption) -> MoveMode {
        let parent_id = match option {
            ParentOption::TopLevel => None,
            ParentOption::Task { id, .. } => Some(*id),
        };
        MoveMode::ToParent {
            list_id: target.list_id(),
            parent_id,
        }
    }

    #[test]
    fn test_every_offered_option_validates() {
        let list_id = Uuid::new_v4();
        let p = Task::new(list_id, "Parent one");
        let c = Task::new(list_id, "Child one").with_parent(p.id);
        let q = Task::new(list_id, "Parent two");
        let q_clash = Task::new(list_id, "Child one").with_parent(q.id);
        let tree = TaskTree::from_tasks(
            list_id,
            vec![p.clone(), c.clone(), q.clone(), q_clash.clone()],
        );
        let l = lists();

        for (source, task_id, target) in [
            (&tree, p.id, &tree),
            (&tree, c.id, &tree),
            (&tree, q_clash.id, &tree),
            (&l.list1, l.x, &l.list2),
            (&l.list1, l.x1, &l.list2),
        ] {
            for option in parent_options(source, task_id, target).unwrap() {
                let mode = mode_for(target, &option);
                assert!(
                    validate_move(source, task_id, target, mode).is_ok(),
                    "{:?} rejected for {}",
                    option,
                    task_id
                );
            }
        }

        // Current parent stays selectable; a parent holding the same title does not
        let options = parent_options(&tree, c.id, &tree).unwrap();
        assert!(options.contains(&ParentOption::TopLevel));
        assert!(options.iter().any(|o| matches!(o, ParentOption::Task { id, .. } if *id == p.id)));
        assert!(!options.iter().any(|o| matches!(o, ParentOption::Task { id, .. } if *id == q.id)));
    }

    #[test]
    fn test_top_level_hidden_when_title_taken() {
        let l1 = Uuid::new_v4();
        let l2 = Uuid::new_v4();
        let moving = Task::new(l1, "Errands");
        let taken = Task::new(l2, "errands");
        let other = Task::new(l2, "Chores");
        let source = TaskTree::from_tasks(l1, vec![moving.clone()]);
        let target = TaskTree::from_tasks(l2, vec![taken, other.clone()]);

        let options = parent_options(&source, moving.id, &target).unwrap();
        assert_eq!(options.len(), 1);
        assert!(matches!(&options[0], ParentOption::Task { id, .. } if *id == other.id));
    }

    #[test]
    fn test_cycle_is_rejected_at_any_depth() {
        let list_id = Uuid::new_v4();
        let a = Task::new(list_id, "Task A");
        let b = Task::new(list_id, "Task B").with_parent(a.id);
        let c = Task::new(list_id, "Task C").with_parent(b.id);
        let tree = TaskTree::from_tasks(list_id, vec![a.clone(), b.clone(), c.clone()]);

        for parent in [a.id, b.id, c.id] {
            let mode = MoveMode::ToParent {
                list_id,
                parent_id: Some(parent),
            };
            let err = validate_move(&tree, a.id, &tree, mode).unwrap_err();
            assert!(matches!(err, Error::Validation(msg) if msg.contains("itself")));
        }
    }

    #[test]
    fn test_move_to_list_becomes_top_level() {
        let l = lists();
        let mode = MoveMode::ToList {
            list_id: l.list2.list_id(),
        };
        let request = validate_move(&l.list1, l.x1, &l.list2, mode).unwrap();
        assert_eq!(request.parent_id, None);

        let same = MoveMode::ToList {
            list_id: l.list1.list_id(),
        };
        assert!(validate_move(&l.list1, l.x1, &l.list1, same).is_err());
    }

    #[test]
    fn test_promote_within_list() {
        let l = lists();
        let top = MoveMode::ToParent {
            list_id: l.list1.list_id(),
            parent_id: None,
        };
        let request = validate_move(&l.list1, l.x1, &l.list1, top).unwrap();
        assert_eq!(request.parent_id, None);

        // Staying put is accepted
        let request = validate_move(&l.list1, l.x, &l.list1, top).unwrap();
        assert_eq!(request.parent_id, None);
        let stay = MoveMode::ToParent {
            list_id: l.list1.list_id(),
            parent_id: Some(l.x),
        };
        let request = validate_move(&l.list1, l.x1, &l.list1, stay).unwrap();
        assert_eq!(request.parent_id, Some(l.x));
    }

    #[test]
    fn test_duplicate_title_at_destination() {
        let l1 = Uuid::new_v4();
        let l2 = Uuid::new_v4();
        let source_task = Task::new(l1, "Shared name");
        let clash = Task::new(l2, "SHARED NAME");
        let source = TaskTree::from_tasks(l1, vec![source_task.clone()]);
        let target = TaskTree::from_tasks(l2, vec![clash]);

        let err = validate_move(&source, source_task.id, &target, MoveMode::ToList { list_id: l2 })
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_open_task_cannot_go_under_done_parent() {
        let list_id = Uuid::new_v4();
        let done = Task::new(list_id, "Finished").with_status(TaskStatus::Done);
        let open = Task::new(list_id, "Still open");
        let tree = TaskTree::from_tasks(list_id, vec![done.clone(), open.clone()]);

        let options = parent_options(&tree, open.id, &tree).unwrap();
        assert_eq!(options, vec![ParentOption::TopLevel]);

        let mode = MoveMode::ToParent {
            list_id,
            parent_id: Some(done.id),
        };
        assert!(matches!(
            validate_move(&tree, open.id, &tree, mode),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_parent() {
        let l = lists();
        let mode = MoveMode::ToParent {
            list_id: l.list2.list_id(),
            parent_id: Some(Uuid::new_v4()),
        };
        assert!(validate_move(&l.list1, l.x, &l.list2, mode).is_err());
    }
}
