//! Session repository
//!
//! Database operations for login sessions.

use crate::db::pool::with_pool;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, user_id, expires_at, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(p)
            .await
            .context("Failed to create session")?;
        });

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Session>(
                "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get session by ID")
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete session")?;
        });
        Ok(())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(user_id)
                .execute(p)
                .await
                .context("Failed to delete sessions by user")?;
        });
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(p)
                .await
                .context("Failed to delete expired sessions")?;
            Ok(result.rows_affected())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Duration;

    async fn setup() -> (Arc<dyn SessionRepository>, Arc<dyn UserRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool),
        )
    }

    async fn create_user(users: &Arc<dyn UserRepository>, name: &str) -> User {
        users
            .create(&User::new(name.into(), String::new(), "hash".into(), false))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (sessions, users) = setup().await;
        let user = create_user(&users, "alice").await;

        let session = Session::start(user.id, Duration::days(7));
        sessions.create(&session).await.unwrap();

        let found = sessions.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(found.user_id, user.id);
        assert!(!found.is_expired());

        assert!(sessions.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (sessions, users) = setup().await;
        let user = create_user(&users, "alice").await;

        let session = Session::start(user.id, Duration::days(7));
        sessions.create(&session).await.unwrap();
        sessions.delete(&session.id).await.unwrap();

        assert!(sessions.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_user() {
        let (sessions, users) = setup().await;
        let alice = create_user(&users, "alice").await;
        let bob = create_user(&users, "bob").await;

        let a1 = Session::start(alice.id, Duration::days(7));
        let a2 = Session::start(alice.id, Duration::days(7));
        let b1 = Session::start(bob.id, Duration::days(7));
        for s in [&a1, &a2, &b1] {
            sessions.create(s).await.unwrap();
        }

        sessions.delete_by_user(alice.id).await.unwrap();

        assert!(sessions.get_by_id(&a1.id).await.unwrap().is_none());
        assert!(sessions.get_by_id(&a2.id).await.unwrap().is_none());
        assert!(sessions.get_by_id(&b1.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (sessions, users) = setup().await;
        let user = create_user(&users, "alice").await;

        let live = Session::start(user.id, Duration::days(1));
        let dead = Session::start(user.id, Duration::days(-1));
        sessions.create(&live).await.unwrap();
        sessions.create(&dead).await.unwrap();

        assert_eq!(sessions.delete_expired().await.unwrap(), 1);
        assert!(sessions.get_by_id(&live.id).await.unwrap().is_some());
        assert!(sessions.get_by_id(&dead.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sessions_removed_with_user() {
        let (sessions, users) = setup().await;
        let user = create_user(&users, "alice").await;
        let session = Session::start(user.id, Duration::days(1));
        sessions.create(&session).await.unwrap();

        users.delete(user.id).await.unwrap();

        assert!(sessions.get_by_id(&session.id).await.unwrap().is_none());
    }
}
