//! To-do model
//!
//! Shared by the HTML to-do list and the task API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A to-do item owned by a single user.
///
/// Serializes as `{id, name, state, created_at, user}` where `user` is the
/// owner's id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Todo {
    pub id: i64,
    pub name: String,
    /// Completion flag
    pub state: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "user")]
    pub user_id: i64,
}

/// Validated input for creating or replacing a to-do
#[derive(Debug, Clone, Default)]
pub struct TodoInput {
    pub name: String,
    pub state: bool,
}

/// Validated partial update for a to-do
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub name: Option<String>,
    pub state: Option<bool>,
}

impl TodoPatch {
    /// Apply the patch on top of an existing item
    pub fn apply_to(self, todo: &Todo) -> TodoInput {
        TodoInput {
            name: self.name.unwrap_or_else(|| todo.name.clone()),
            state: self.state.unwrap_or(todo.state),
        }
    }
}
