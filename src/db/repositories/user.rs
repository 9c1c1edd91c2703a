//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::pool::{with_pool, LastInsertId};
use crate::db::DynDatabasePool;
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, avatar, is_staff, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Whether `username` belongs to a user other than `except_id`
    async fn username_taken(&self, username: &str, except_id: Option<i64>) -> Result<bool>;

    /// Update profile fields (username, email, avatar) and bump `updated_at`
    async fn update_profile(&self, user: &User) -> Result<User>;

    /// Replace the password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO users (username, email, password_hash, avatar, is_staff, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(user.is_staff)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create user")?
            .last_id()
        });

        Ok(User {
            id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get user by ID")
        })
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .fetch_optional(p)
                .await
                .context("Failed to get user by username")
        })
    }

    async fn username_taken(&self, username: &str, except_id: Option<i64>) -> Result<bool> {
        let count: i64 = with_pool!(self.pool, |p| {
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND id <> ?")
                .bind(username)
                .bind(except_id.unwrap_or(0))
                .fetch_one(p)
                .await
                .context("Failed to check username")?
        });
        Ok(count > 0)
    }

    async fn update_profile(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let affected = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE users
                SET username = ?, email = ?, avatar = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.avatar)
            .bind(now)
            .bind(user.id)
            .execute(p)
            .await
            .context("Failed to update user")?
            .rows_affected()
        });

        if affected == 0 {
            anyhow::bail!("User {} not found", user.id);
        }

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(now)
                .bind(id)
                .execute(p)
                .await
                .context("Failed to update password")?;
        });
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete user")?;
        });
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(p)
                .await
                .context("Failed to count users")
        })
    }
}
