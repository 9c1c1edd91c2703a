//! Author repository

use super::{bind_all, WhereClause};
use crate::db::pool::{with_pool, LastInsertId};
use crate::db::DynDatabasePool;
use crate::models::{Author, AuthorInput, ListQuery, PagedResult, LIST_PER_PAGE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// Changelist page ordered by last name
    async fn list(&self, query: &ListQuery) -> Result<PagedResult<Author>>;

    /// Every author ordered by last name, for the book form
    async fn list_all(&self) -> Result<Vec<Author>>;

    async fn get(&self, id: i64) -> Result<Option<Author>>;

    async fn create(&self, input: &AuthorInput) -> Result<Author>;

    async fn update(&self, id: i64, input: &AuthorInput) -> Result<Option<Author>>;

    /// Delete the author; only their book links go with them
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based author repository
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn list(&self, query: &ListQuery) -> Result<PagedResult<Author>> {
        let mut clause = WhereClause::new();
        clause.search(&query.terms, &["first_name", "last_name"]);

        let count_sql = format!("SELECT COUNT(*) FROM authors{}", clause.sql());
        let list_sql = format!(
            "SELECT id, first_name, last_name FROM authors{} ORDER BY last_name, id DESC LIMIT ? OFFSET ?",
            clause.sql()
        );

        let (items, total) = with_pool!(self.pool, |p, DB| {
            let total: i64 = bind_all!(sqlx::query_scalar::<DB, i64>(&count_sql), clause.binds())
                .fetch_one(p)
                .await
                .context("Failed to count authors")?;
            let items = bind_all!(sqlx::query_as::<DB, Author>(&list_sql), clause.binds())
                .bind(LIST_PER_PAGE)
                .bind(query.offset())
                .fetch_all(p)
                .await
                .context("Failed to list authors")?;
            (items, total)
        });

        Ok(PagedResult::new(items, total, query))
    }

    async fn list_all(&self) -> Result<Vec<Author>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Author>(
                "SELECT id, first_name, last_name FROM authors ORDER BY last_name, first_name, id",
            )
            .fetch_all(p)
            .await
            .context("Failed to list authors")
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Author>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Author>("SELECT id, first_name, last_name FROM authors WHERE id = ?")
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get author")
        })
    }

    async fn create(&self, input: &AuthorInput) -> Result<Author> {
        let id = with_pool!(self.pool, |p| {
            sqlx::query("INSERT INTO authors (first_name, last_name) VALUES (?, ?)")
                .bind(&input.first_name)
                .bind(&input.last_name)
                .execute(p)
                .await
                .context("Failed to create author")?
                .last_id()
        });

        Ok(Author {
            id,
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
        })
    }

    async fn update(&self, id: i64, input: &AuthorInput) -> Result<Option<Author>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE authors SET first_name = ?, last_name = ? WHERE id = ?")
                .bind(&input.first_name)
                .bind(&input.last_name)
                .bind(id)
                .execute(p)
                .await
                .context("Failed to update author")?;
        });

        self.get(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM authors WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete author")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar("SELECT COUNT(*) FROM authors")
                .fetch_one(p)
                .await
                .context("Failed to count authors")
        })
    }
}
