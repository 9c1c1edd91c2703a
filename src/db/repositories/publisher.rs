//! Publisher repository
//!
//! Publishers are saved together with their inline book rows, inside one
//! transaction.

use super::{bind_all, BindValue, WhereClause};
use crate::db::pool::{with_pool, LastInsertId};
use crate::db::DynDatabasePool;
use crate::models::{Book, InlineBookInput, ListQuery, PagedResult, Publisher, PublisherInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Publisher repository trait
#[async_trait]
pub trait PublisherRepository: Send + Sync {
    /// Changelist page, optionally restricted to an exact name
    async fn list(&self, query: &ListQuery, name: Option<&str>) -> Result<PagedResult<Publisher>>;

    /// Every publisher ordered by name
    async fn list_all(&self) -> Result<Vec<Publisher>>;

    /// Distinct publisher names for the sidebar filter
    async fn distinct_names(&self) -> Result<Vec<String>>;

    async fn get(&self, id: i64) -> Result<Option<Publisher>>;

    /// Books owned by the publisher, oldest first
    async fn books(&self, id: i64) -> Result<Vec<Book>>;

    /// Insert the publisher and its inline books
    async fn create(&self, input: &PublisherInput, books: &[InlineBookInput]) -> Result<Publisher>;

    /// Update the publisher and apply inline book changes; `None` if missing
    async fn update(
        &self,
        id: i64,
        input: &PublisherInput,
        books: &[InlineBookInput],
    ) -> Result<Option<Publisher>>;

    /// Delete the publisher; its books go with it
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based publisher repository
pub struct SqlxPublisherRepository {
    pool: DynDatabasePool,
}

impl SqlxPublisherRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PublisherRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Apply inline rows for `publisher_id` inside an open transaction.
///
/// Rows marked for deletion are removed, existing rows updated and new rows
/// inserted. Ids that do not belong to the publisher are ignored.
macro_rules! save_inline_books {
    ($tx:expr, $publisher_id:expr, $books:expr) => {{
        for book in $books {
            match (book.id, book.delete) {
                (Some(id), true) => {
                    sqlx::query("DELETE FROM books WHERE id = ? AND publisher_id = ?")
                        .bind(id)
                        .bind($publisher_id)
                        .execute(&mut *$tx)
                        .await
                        .context("Failed to delete inline book")?;
                }
                (Some(id), false) => {
                    sqlx::query(
                        "UPDATE books SET title = ?, publish_date = ?, available = ? WHERE id = ? AND publisher_id = ?",
                    )
                    .bind(&book.title)
                    .bind(book.publish_date)
                    .bind(book.available)
                    .bind(id)
                    .bind($publisher_id)
                    .execute(&mut *$tx)
                    .await
                    .context("Failed to update inline book")?;
                }
                (None, false) => {
                    sqlx::query(
                        "INSERT INTO books (title, publisher_id, publish_date, available) VALUES (?, ?, ?, ?)",
                    )
                    .bind(&book.title)
                    .bind($publisher_id)
                    .bind(book.publish_date)
                    .bind(book.available)
                    .execute(&mut *$tx)
                    .await
                    .context("Failed to insert inline book")?;
                }
                (None, true) => {}
            }
        }
    }};
}

#[async_trait]
impl PublisherRepository for SqlxPublisherRepository {
    async fn list(&self, query: &ListQuery, name: Option<&str>) -> Result<PagedResult<Publisher>> {
        let mut clause = WhereClause::new();
        clause.search(&query.terms, &["name"]);
        if let Some(name) = name {
            clause.push("name = ?", [BindValue::Text(name.to_string())]);
        }

        let count_sql = format!("SELECT COUNT(*) FROM publishers{}", clause.sql());
        let list_sql = format!(
            "SELECT id, name, address FROM publishers{} ORDER BY id DESC LIMIT ? OFFSET ?",
            clause.sql()
        );

        let (items, total) = with_pool!(self.pool, |p, DB| {
            let total: i64 = bind_all!(sqlx::query_scalar::<DB, i64>(&count_sql), clause.binds())
                .fetch_one(p)
                .await
                .context("Failed to count publishers")?;
            let items = bind_all!(sqlx::query_as::<DB, Publisher>(&list_sql), clause.binds())
                .bind(crate::models::LIST_PER_PAGE)
                .bind(query.offset())
                .fetch_all(p)
                .await
                .context("Failed to list publishers")?;
            (items, total)
        });

        Ok(PagedResult::new(items, total, query))
    }

    async fn list_all(&self) -> Result<Vec<Publisher>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Publisher>("SELECT id, name, address FROM publishers ORDER BY name, id")
                .fetch_all(p)
                .await
                .context("Failed to list publishers")
        })
    }

    async fn distinct_names(&self) -> Result<Vec<String>> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, String>("SELECT DISTINCT name FROM publishers ORDER BY name")
                .fetch_all(p)
                .await
                .context("Failed to list publisher names")
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Publisher>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Publisher>("SELECT id, name, address FROM publishers WHERE id = ?")
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get publisher")
        })
    }

    async fn books(&self, id: i64) -> Result<Vec<Book>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Book>(
                "SELECT id, title, publisher_id, publish_date, available FROM books WHERE publisher_id = ? ORDER BY id",
            )
            .bind(id)
            .fetch_all(p)
            .await
            .context("Failed to list publisher books")
        })
    }

    async fn create(&self, input: &PublisherInput, books: &[InlineBookInput]) -> Result<Publisher> {
        let id = with_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query("INSERT INTO publishers (name, address) VALUES (?, ?)")
                .bind(&input.name)
                .bind(&input.address)
                .execute(&mut *tx)
                .await
                .context("Failed to create publisher")?
                .last_id();
            save_inline_books!(tx, id, books);
            tx.commit().await.context("Failed to commit publisher")?;
            id
        });

        Ok(Publisher {
            id,
            name: input.name.clone(),
            address: input.address.clone(),
        })
    }

    async fn update(
        &self,
        id: i64,
        input: &PublisherInput,
        books: &[InlineBookInput],
    ) -> Result<Option<Publisher>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        with_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            sqlx::query("UPDATE publishers SET name = ?, address = ? WHERE id = ?")
                .bind(&input.name)
                .bind(&input.address)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to update publisher")?;
            save_inline_books!(tx, id, books);
            tx.commit().await.context("Failed to commit publisher")?;
        });

        self.get(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM publishers WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete publisher")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar("SELECT COUNT(*) FROM publishers")
                .fetch_one(p)
                .await
                .context("Failed to count publishers")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::NaiveDate;

    async fn setup() -> Arc<dyn PublisherRepository> {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxPublisherRepository::boxed(pool)
    }

    fn publisher(name: &str) -> PublisherInput {
        PublisherInput {
            name: name.to_string(),
            address: String::new(),
        }
    }

    fn new_book(title: &str) -> InlineBookInput {
        InlineBookInput {
            id: None,
            title: title.to_string(),
            publish_date: None,
            available: true,
            delete: false,
        }
    }

    #[tokio::test]
    async fn test_create_with_inline_books() {
        let repo = setup().await;
        let created = repo
            .create(&publisher("Acme"), &[new_book("One"), new_book("Two")])
            .await
            .unwrap();

        let books = repo.books(created.id).await.unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
        assert!(books.iter().all(|b| b.available));
    }

    #[tokio::test]
    async fn test_update_applies_inline_changes() {
        let repo = setup().await;
        let created = repo
            .create(&publisher("Acme"), &[new_book("Keep"), new_book("Drop")])
            .await
            .unwrap();
        let books = repo.books(created.id).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let rows = vec![
            InlineBookInput {
                id: Some(books[0].id),
                title: "Kept".to_string(),
                publish_date: Some(date),
                available: false,
                delete: false,
            },
            InlineBookInput {
                id: Some(books[1].id),
                delete: true,
                ..new_book("Drop")
            },
            new_book("Added"),
        ];

        let updated = repo
            .update(created.id, &publisher("Acme Press"), &rows)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Acme Press");

        let books = repo.books(created.id).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Kept");
        assert_eq!(books[0].publish_date, Some(date));
        assert!(!books[0].available);
        assert_eq!(books[1].title, "Added");
    }

    #[tokio::test]
    async fn test_inline_rows_cannot_touch_other_publishers() {
        let repo = setup().await;
        let acme = repo.create(&publisher("Acme"), &[new_book("Acme book")]).await.unwrap();
        let other = repo.create(&publisher("Other"), &[]).await.unwrap();
        let acme_book = repo.books(acme.id).await.unwrap()[0].id;

        let rows = vec![InlineBookInput {
            id: Some(acme_book),
            delete: true,
            ..new_book("x")
        }];
        repo.update(other.id, &publisher("Other"), &rows).await.unwrap();

        assert_eq!(repo.books(acme.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_publisher() {
        let repo = setup().await;
        assert!(repo.update(99, &publisher("X"), &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_search_and_name_filter() {
        let repo = setup().await;
        for name in ["Penguin", "Pan Macmillan", "Orbit"] {
            repo.create(&publisher(name), &[]).await.unwrap();
        }

        let all = repo.list(&ListQuery::default(), None).await.unwrap();
        assert_eq!(all.total, 3);
        // newest first
        assert_eq!(all.items[0].name, "Orbit");

        let found = repo.list(&ListQuery::new(Some("pan"), 1), None).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].name, "Pan Macmillan");

        let named = repo.list(&ListQuery::default(), Some("Orbit")).await.unwrap();
        assert_eq!(named.total, 1);

        let names = repo.distinct_names().await.unwrap();
        assert_eq!(names, vec!["Orbit", "Pan Macmillan", "Penguin"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_books() {
        let repo = setup().await;
        let acme = repo.create(&publisher("Acme"), &[new_book("B")]).await.unwrap();

        assert!(repo.delete(acme.id).await.unwrap());
        assert!(repo.get(acme.id).await.unwrap().is_none());
        assert!(repo.books(acme.id).await.unwrap().is_empty());
        assert!(!repo.delete(acme.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
