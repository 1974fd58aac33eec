//! Persistent authority of record
//!
//! [`FileTodoStore`] holds every user's lists and tasks and re-enforces the
//! tree rules on each write. [`ScopedTodoStore`] binds it to one user and
//! exposes it through [`TodoApi`](crate::api::TodoApi).

mod file_store;
mod scoped;

pub use file_store::FileTodoStore;
pub use scoped::ScopedTodoStore;
