//! Task module
//!
//! This module contains task-related types and validation rules.

mod model;
mod validate;

pub use model::*;
pub use validate::*;
