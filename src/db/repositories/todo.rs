//! To-do repository
//!
//! Every query is scoped to the owning user; there is no way to reach another
//! user's rows through this trait.

use crate::db::pool::{with_pool, LastInsertId};
use crate::db::DynDatabasePool;
use crate::models::{Todo, TodoInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// To-do repository trait
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// List a user's to-dos in creation order
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Todo>>;

    /// Get one of a user's to-dos
    async fn get_for_user(&self, user_id: i64, id: i64) -> Result<Option<Todo>>;

    /// Create a to-do owned by `user_id`
    async fn create(&self, user_id: i64, input: &TodoInput) -> Result<Todo>;

    /// Overwrite name and state; `None` when the row is not the user's
    async fn update(&self, user_id: i64, id: i64, input: &TodoInput) -> Result<Option<Todo>>;

    /// Delete a to-do; returns whether a row was removed
    async fn delete(&self, user_id: i64, id: i64) -> Result<bool>;
}

/// SQLx-based to-do repository
pub struct SqlxTodoRepository {
    pool: DynDatabasePool,
}

impl SqlxTodoRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TodoRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TodoRepository for SqlxTodoRepository {
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Todo>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Todo>(
                "SELECT id, name, state, created_at, user_id FROM todos WHERE user_id = ? ORDER BY id",
            )
            .bind(user_id)
            .fetch_all(p)
            .await
            .context("Failed to list todos")
        })
    }

    async fn get_for_user(&self, user_id: i64, id: i64) -> Result<Option<Todo>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Todo>(
                "SELECT id, name, state, created_at, user_id FROM todos WHERE id = ? AND user_id = ?",
            )
            .bind(id)
            .bind(user_id)
            .fetch_optional(p)
            .await
            .context("Failed to get todo")
        })
    }

    async fn create(&self, user_id: i64, input: &TodoInput) -> Result<Todo> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO todos (user_id, name, state, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(&input.name)
            .bind(input.state)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create todo")?
            .last_id()
        });

        Ok(Todo {
            id,
            name: input.name.clone(),
            state: input.state,
            created_at: now,
            user_id,
        })
    }

    async fn update(&self, user_id: i64, id: i64, input: &TodoInput) -> Result<Option<Todo>> {
        // MySQL reports zero affected rows for a no-op update, so existence
        // is checked separately.
        if self.get_for_user(user_id, id).await?.is_none() {
            return Ok(None);
        }

        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE todos SET name = ?, state = ? WHERE id = ? AND user_id = ?")
                .bind(&input.name)
                .bind(input.state)
                .bind(id)
                .bind(user_id)
                .execute(p)
                .await
                .context("Failed to update todo")?;
        });

        self.get_for_user(user_id, id).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(p)
                .await
                .context("Failed to delete todo")?;
            Ok(result.rows_affected() > 0)
        })
    }
}
