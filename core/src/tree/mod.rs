//! Task tree store
//!
//! Navigable, depth-limited forest of one list's tasks.

mod task_tree;

pub use task_tree::{TaskSummary, TaskTree};
