//! To-do service
//!
//! One store, two surfaces: the HTML to-do list submits form fields and the
//! task API submits JSON. Both are turned into a validated [`TodoInput`] or
//! [`TodoPatch`] here and every operation is scoped to the calling user.

use crate::db::repositories::TodoRepository;
use crate::models::{Todo, TodoInput, TodoPatch};
use crate::services::validation::{self, messages, ValidationErrors};
use anyhow::Context;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Longest accepted to-do name
pub const TODO_NAME_MAX_LENGTH: usize = 200;

/// Error types for to-do operations
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Missing, or owned by someone else
    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for TodoServiceError {
    fn from(errors: ValidationErrors) -> Self {
        TodoServiceError::Validation(errors)
    }
}

/// Validate the HTML add-task form
pub fn form_input(name: &str, state: Option<&str>) -> Result<TodoInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = errors.check(
        "name",
        validation::text(name, TODO_NAME_MAX_LENGTH, Some(messages::REQUIRED)),
    );
    let state = validation::checkbox(state);
    errors.into_result(())?;
    Ok(TodoInput {
        name: name.unwrap_or_default(),
        state,
    })
}

/// Validate a full JSON task body (create and PUT).
///
/// `name` is required; `state` defaults to false. `id`, `user` and
/// `created_at` are read-only and ignored.
pub fn json_input(body: &Map<String, Value>) -> Result<TodoInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match errors.check("name", validation::json_string(body, "name")) {
        Some(None) => {
            errors.add("name", messages::REQUIRED);
            None
        }
        Some(Some(raw)) => errors.check(
            "name",
            validation::text(&raw, TODO_NAME_MAX_LENGTH, Some(messages::BLANK)),
        ),
        None => None,
    };
    let state = errors
        .check("state", validation::json_bool(body, "state"))
        .flatten()
        .unwrap_or(false);

    errors.into_result(())?;
    Ok(TodoInput {
        name: name.unwrap_or_default(),
        state,
    })
}

/// Validate a partial JSON task body (PATCH)
pub fn json_patch(body: &Map<String, Value>) -> Result<TodoPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = errors
        .check("name", validation::json_string(body, "name"))
        .flatten()
        .and_then(|raw| {
            errors.check(
                "name",
                validation::text(&raw, TODO_NAME_MAX_LENGTH, Some(messages::BLANK)),
            )
        });
    let state = errors.check("state", validation::json_bool(body, "state")).flatten();

    errors.into_result(TodoPatch { name, state })
}

/// To-do service
pub struct TodoService {
    repo: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(repo: Arc<dyn TodoRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Todo>, TodoServiceError> {
        Ok(self
            .repo
            .list_for_user(user_id)
            .await
            .context("Failed to list todos")?)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Todo, TodoServiceError> {
        self.repo
            .get_for_user(user_id, id)
            .await
            .context("Failed to get todo")?
            .ok_or(TodoServiceError::NotFound)
    }

    /// Create a to-do owned by `user_id`
    pub async fn create(&self, user_id: i64, input: TodoInput) -> Result<Todo, TodoServiceError> {
        let todo = self
            .repo
            .create(user_id, &input)
            .await
            .context("Failed to create todo")?;
        tracing::debug!(user_id, todo_id = todo.id, "todo created");
        Ok(todo)
    }

    /// Full replacement of name and state
    pub async fn replace(
        &self,
        user_id: i64,
        id: i64,
        input: TodoInput,
    ) -> Result<Todo, TodoServiceError> {
        self.repo
            .update(user_id, id, &input)
            .await
            .context("Failed to update todo")?
            .ok_or(TodoServiceError::NotFound)
    }

    /// Partial update; absent fields keep their value
    pub async fn patch(
        &self,
        user_id: i64,
        id: i64,
        patch: TodoPatch,
    ) -> Result<Todo, TodoServiceError> {
        let current = self.get(user_id, id).await?;
        self.replace(user_id, id, patch.apply_to(&current)).await
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), TodoServiceError> {
        let removed = self
            .repo
            .delete(user_id, id)
            .await
            .context("Failed to delete todo")?;
        if removed {
            Ok(())
        } else {
            Err(TodoServiceError::NotFound)
        }
    }
}
