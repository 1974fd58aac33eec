//! In-memory task tree for a single list
//!
//! Tasks are held in an index keyed by id; parent/child relations are id
//! references, so the tree never owns cyclic pointers.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::api::TodoApi;
use crate::task::{Task, TaskNode, TaskStatus};
use crate::{Error, Result};

/// Progress counters for a whole list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
}

impl TaskSummary {
    /// Completion percentage, rounded down; 0 for an empty list
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

/// Task forest of one list
#[derive(Debug, Clone)]
pub struct TaskTree {
    list_id: Uuid,
    tasks: HashMap<Uuid, Task>,
    roots: Vec<Uuid>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl TaskTree {
    /// Create an empty tree for a list
    pub fn new(list_id: Uuid) -> Self {
        Self {
            list_id,
            tasks: HashMap::new(),
            roots: Vec::new(),
            children: HashMap::new(),
        }
    }

    /// Fetch a list's tasks through the API and index them.
    ///
    /// Failures are wrapped in [`Error::Fetch`] and never retried here.
    pub async fn load<A>(api: &A, list_id: Uuid) -> Result<Self>
    where
        A: TodoApi + ?Sized,
    {
        let nodes = api.list_tasks(list_id).await.map_err(|source| Error::Fetch {
            list_id,
            source: Box::new(source),
        })?;
        let tree = Self::from_nodes(list_id, nodes);
        debug!("Loaded {} tasks for list {}", tree.len(), list_id);
        Ok(tree)
    }

    /// Build from the nested wire form, keeping sibling order.
    ///
    /// Parent links are taken from the nesting, not from `parent_id`. A
    /// repeated id is skipped along with its subtasks.
    pub fn from_nodes(list_id: Uuid, nodes: Vec<TaskNode>) -> Self {
        let mut tree = Self::new(list_id);
        let mut stack: Vec<(Option<Uuid>, TaskNode)> =
            nodes.into_iter().rev().map(|node| (None, node)).collect();

        while let Some((parent_id, node)) = stack.pop() {
            let (mut task, subtasks) = node.into_parts();
            if tree.tasks.contains_key(&task.id) {
                continue;
            }
            task.parent_id = parent_id;
            let id = task.id;
            tree.attach(task);
            stack.extend(subtasks.into_iter().rev().map(|sub| (Some(id), sub)));
        }

        tree
    }

    /// Build from flat records, ordering siblings by creation time.
    ///
    /// Records whose parent is missing are treated as top-level, and so is
    /// the task where a parent chain loops back on itself.
    pub fn from_tasks(list_id: Uuid, tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut tasks: Vec<Task> = tasks.into_iter().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let mut unique = HashSet::new();
        tasks.retain(|task| unique.insert(task.id));

        let mut parents: HashMap<Uuid, Option<Uuid>> =
            tasks.iter().map(|t| (t.id, t.parent_id)).collect();
        for task in &tasks {
            if task
                .parent_id
                .is_some_and(|p| !parents.contains_key(&p) || p == task.id)
            {
                parents.insert(task.id, None);
            }
        }
        for task in &tasks {
            let mut seen = HashSet::from([task.id]);
            let mut current = parents.get(&task.id).copied().flatten();
            while let Some(parent_id) = current {
                if !seen.insert(parent_id) {
                    debug!("Parent cycle at task {}, treating it as top-level", parent_id);
                    parents.insert(parent_id, None);
                    break;
                }
                current = parents.get(&parent_id).copied().flatten();
            }
        }

        let mut tree = Self::new(list_id);
        for mut task in tasks {
            task.parent_id = parents.get(&task.id).copied().flatten();
            tree.attach(task);
        }

        tree
    }

    fn attach(&mut self, task: Task) {
        match task.parent_id {
            Some(parent_id) => self.children.entry(parent_id).or_default().push(task.id),
            None => self.roots.push(task.id),
        }
        self.tasks.insert(task.id, task);
    }

    /// Render back to the nested wire form
    pub fn to_nodes(&self) -> Vec<TaskNode> {
        self.roots.iter().map(|id| self.node_for(*id)).collect()
    }

    fn node_for(&self, id: Uuid) -> TaskNode {
        self.node_within(id, &mut HashSet::new())
    }

    fn node_within(&self, id: Uuid, visited: &mut HashSet<Uuid>) -> TaskNode {
        visited.insert(id);
        let subtasks = self
            .child_ids(id)
            .iter()
            .filter(|child| !visited.contains(*child) && self.tasks.contains_key(*child))
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|child| self.node_within(child, visited))
            .collect();
        TaskNode::from_task(self.tasks[&id].clone(), subtasks)
    }

    pub fn list_id(&self) -> Uuid {
        self.list_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Look a task up by id. Ids are unique, so at most one task matches.
    pub fn find_by_id(&self, id: Uuid) -> Option<&Task> {
        self.get(id)
    }

    /// Immediate parent, or `None` for top-level or unknown tasks
    pub fn find_parent(&self, child_id: Uuid) -> Option<&Task> {
        self.tasks
            .get(&child_id)
            .and_then(|task| task.parent_id)
            .and_then(|parent_id| self.tasks.get(&parent_id))
    }

    pub fn root_ids(&self) -> &[Uuid] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &Task> + '_ {
        self.roots.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn child_ids(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self, id: Uuid) -> impl Iterator<Item = &Task> + '_ {
        self.child_ids(id)
            .iter()
            .filter_map(|child| self.tasks.get(child))
    }

    /// Ids of the tasks sharing `parent_id` (top-level when `None`)
    pub fn sibling_ids(&self, parent_id: Option<Uuid>) -> &[Uuid] {
        match parent_id {
            Some(parent_id) => self.child_ids(parent_id),
            None => &self.roots,
        }
    }

    /// Number of ancestors of a task.
    ///
    /// Unknown ids report 0 rather than failing.
    pub fn depth_of(&self, id: Uuid) -> usize {
        let mut depth = 0;
        let mut current = self.tasks.get(&id).and_then(|t| t.parent_id);
        while let Some(parent_id) = current {
            if depth > self.tasks.len() {
                break;
            }
            depth += 1;
            current = self.tasks.get(&parent_id).and_then(|t| t.parent_id);
        }
        depth
    }

    /// Levels below a task: 0 for a leaf, 1 with children, 2 with grandchildren
    pub fn subtree_height(&self, id: Uuid) -> usize {
        let mut height = 0;
        let mut visited = HashSet::from([id]);
        let mut stack: Vec<(Uuid, usize)> = vec![(id, 0)];
        while let Some((next, level)) = stack.pop() {
            height = height.max(level);
            for child in self.child_ids(next) {
                if visited.insert(*child) {
                    stack.push((*child, level + 1));
                }
            }
        }
        height
    }

    /// All descendants of a task in pre-order (parent before children)
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut out = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut stack: Vec<Uuid> = self.child_ids(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.child_ids(next).iter().rev());
        }
        out
    }

    /// The task itself plus all of its descendants
    pub fn subtree_ids(&self, id: Uuid) -> HashSet<Uuid> {
        let mut ids: HashSet<Uuid> = self.descendants(id).into_iter().collect();
        ids.insert(id);
        ids
    }

    /// Every task, depth-first, pre-order
    pub fn preorder(&self) -> Vec<&Task> {
        let mut out = Vec::with_capacity(self.tasks.len());
        let mut stack: Vec<Uuid> = self.roots.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if let Some(task) = self.tasks.get(&next) {
                out.push(task);
            }
            stack.extend(self.child_ids(next).iter().rev());
        }
        out
    }

    /// Total and completed task counts over the whole tree
    pub fn count_summary(&self) -> TaskSummary {
        TaskSummary {
            total: self.tasks.len(),
            completed: self.tasks.values().filter(|t| t.status.is_done()).count(),
        }
    }

    /// Whether every direct child is Done (vacuously true for leaves)
    pub fn all_children_done(&self, id: Uuid) -> bool {
        self.children(id).all(|child| child.status.is_done())
    }

    /// Case-insensitive title clash among the tasks sharing `parent_id`
    pub fn has_sibling_titled(
        &self,
        parent_id: Option<Uuid>,
        title: &str,
        exclude: Option<Uuid>,
    ) -> bool {
        let wanted = title.trim().to_lowercase();
        self.sibling_ids(parent_id)
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| self.tasks.get(id))
            .any(|task| task.title.trim().to_lowercase() == wanted)
    }

    pub(crate) fn set_status(&mut self, id: Uuid, status: TaskStatus) -> bool {
        match self.tasks.get_mut(&id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    /// Tasks in this tree, in no particular order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values()
    }
}
