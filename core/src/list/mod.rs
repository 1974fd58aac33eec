//! Todo list module
//!
//! A list is a named collection of top-level tasks owned by a user.

mod model;

pub use model::*;
