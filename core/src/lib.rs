//! Core library for the hierarchical todo app
//!
//! This crate contains the task-hierarchy logic:
//! - Task tree store (lookup and traversal over a list's task forest)
//! - Status propagation (completion and reopen cascades)
//! - Move/reparent validation
//!
//! plus the CRUD interface it runs against, with an HTTP client and a
//! JSON-file store implementing it.

pub mod api;
pub mod board;
pub mod error;
pub mod list;
pub mod mover;
pub mod status;
pub mod store;
pub mod task;
pub mod tree;

pub use api::{AuthApi, HttpTodoApi, TodoApi};
pub use board::{ReopenDescendants, ReopenPrompt, StatusOutcome, TaskBoard};
pub use error::{Error, ErrorKind};
pub use store::{FileTodoStore, ScopedTodoStore};
pub use tree::{TaskSummary, TaskTree};

pub type Result<T> = std::result::Result<T, Error>;
