//! Book repository
//!
//! Books carry their author links in `book_authors`; writes replace the links
//! in the same transaction as the book row.

use super::{bind_all, BindValue, WhereClause};
use crate::db::pool::{with_pool, LastInsertId};
use crate::db::DynDatabasePool;
use crate::models::{
    Book, BookFilter, BookInput, BookSummary, DateBounds, ListQuery, PagedResult, LIST_PER_PAGE,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

/// Book repository trait
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Changelist page, newest first, with the authors column filled
    async fn list(
        &self,
        query: &ListQuery,
        filter: &BookFilter,
        today: NaiveDate,
    ) -> Result<PagedResult<BookSummary>>;

    /// Distinct publish dates matching search and sidebar filters, ascending.
    ///
    /// The date drill-down itself is not applied.
    async fn publish_dates(
        &self,
        query: &ListQuery,
        filter: &BookFilter,
        today: NaiveDate,
    ) -> Result<Vec<NaiveDate>>;

    async fn get(&self, id: i64) -> Result<Option<Book>>;

    /// Ids of the book's authors
    async fn author_ids(&self, id: i64) -> Result<Vec<i64>>;

    async fn create(&self, input: &BookInput) -> Result<Book>;

    async fn update(&self, id: i64, input: &BookInput) -> Result<Option<Book>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based book repository
pub struct SqlxBookRepository {
    pool: DynDatabasePool,
}

impl SqlxBookRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn BookRepository> {
        Arc::new(Self::new(pool))
    }

    /// Comma-joined author last names keyed by book id
    async fn author_names(&self, book_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; book_ids.len()].join(", ");
        let sql = format!(
            "SELECT ba.book_id, a.last_name FROM book_authors ba \
             JOIN authors a ON a.id = ba.author_id \
             WHERE ba.book_id IN ({}) ORDER BY ba.book_id, a.id",
            placeholders
        );
        let binds: Vec<BindValue> = book_ids.iter().map(|id| BindValue::Int(*id)).collect();

        let rows: Vec<(i64, String)> = with_pool!(self.pool, |p, DB| {
            bind_all!(sqlx::query_as::<DB, (i64, String)>(&sql), &binds)
                .fetch_all(p)
                .await
                .context("Failed to load book authors")?
        });

        let mut names: HashMap<i64, Vec<String>> = HashMap::new();
        for (book_id, last_name) in rows {
            names.entry(book_id).or_default().push(last_name);
        }
        Ok(names
            .into_iter()
            .map(|(id, list)| (id, list.join(", ")))
            .collect())
    }
}

/// Build the shared WHERE clause for the books changelist
fn filter_clause(
    query: &ListQuery,
    filter: &BookFilter,
    today: NaiveDate,
    with_drill_down: bool,
) -> WhereClause {
    let mut clause = WhereClause::new();
    clause.search(&query.terms, &["b.title"]);

    if let Some(publisher_id) = filter.publisher_id {
        clause.push("b.publisher_id = ?", [BindValue::Int(publisher_id)]);
    }

    if let Some(range) = filter.date_range {
        match range.bounds(today) {
            DateBounds::Between(start, end) => clause.push(
                "b.publish_date >= ? AND b.publish_date < ?",
                [BindValue::Date(start), BindValue::Date(end)],
            ),
            DateBounds::IsNull => clause.push("b.publish_date IS NULL", []),
            DateBounds::NotNull => clause.push("b.publish_date IS NOT NULL", []),
        }
    }

    if with_drill_down {
        if let Some((start, end)) = filter.drill_down.bounds() {
            clause.push(
                "b.publish_date >= ? AND b.publish_date < ?",
                [BindValue::Date(start), BindValue::Date(end)],
            );
        } else if !filter.drill_down.is_empty() {
            // An impossible calendar date matches nothing.
            clause.push("1 = 0", []);
        }
    }

    clause
}

/// Insert one link row per author
macro_rules! insert_author_links {
    ($tx:expr, $book_id:expr, $author_ids:expr) => {{
        for author_id in $author_ids {
            sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES (?, ?)")
                .bind($book_id)
                .bind(*author_id)
                .execute(&mut *$tx)
                .await
                .context("Failed to link book author")?;
        }
    }};
}

#[async_trait]
impl BookRepository for SqlxBookRepository {
    async fn list(
        &self,
        query: &ListQuery,
        filter: &BookFilter,
        today: NaiveDate,
    ) -> Result<PagedResult<BookSummary>> {
        let clause = filter_clause(query, filter, today, true);
        let from = "FROM books b JOIN publishers p ON p.id = b.publisher_id";
        let count_sql = format!("SELECT COUNT(*) {}{}", from, clause.sql());
        let list_sql = format!(
            "SELECT b.id, b.title, b.publish_date, b.publisher_id, p.name AS publisher_name \
             {}{} ORDER BY b.id DESC LIMIT ? OFFSET ?",
            from,
            clause.sql()
        );

        let (mut items, total) = with_pool!(self.pool, |p, DB| {
            let total: i64 = bind_all!(sqlx::query_scalar::<DB, i64>(&count_sql), clause.binds())
                .fetch_one(p)
                .await
                .context("Failed to count books")?;
            let items = bind_all!(sqlx::query_as::<DB, BookSummary>(&list_sql), clause.binds())
                .bind(LIST_PER_PAGE)
                .bind(query.offset())
                .fetch_all(p)
                .await
                .context("Failed to list books")?;
            (items, total)
        });

        let ids: Vec<i64> = items.iter().map(|b| b.id).collect();
        let mut names = self.author_names(&ids).await?;
        for item in &mut items {
            item.authors = names.remove(&item.id).unwrap_or_default();
        }

        Ok(PagedResult::new(items, total, query))
    }

    async fn publish_dates(
        &self,
        query: &ListQuery,
        filter: &BookFilter,
        today: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let mut clause = filter_clause(query, filter, today, false);
        clause.push("b.publish_date IS NOT NULL", []);
        let sql = format!(
            "SELECT DISTINCT b.publish_date FROM books b{} ORDER BY b.publish_date",
            clause.sql()
        );

        with_pool!(self.pool, |p, DB| {
            bind_all!(sqlx::query_scalar::<DB, NaiveDate>(&sql), clause.binds())
                .fetch_all(p)
                .await
                .context("Failed to list publish dates")
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Book>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Book>(
                "SELECT id, title, publisher_id, publish_date, available FROM books WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get book")
        })
    }

    async fn author_ids(&self, id: i64) -> Result<Vec<i64>> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>(
                "SELECT author_id FROM book_authors WHERE book_id = ? ORDER BY author_id",
            )
            .bind(id)
            .fetch_all(p)
            .await
            .context("Failed to get book authors")
        })
    }

    async fn create(&self, input: &BookInput) -> Result<Book> {
        let id = with_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(
                "INSERT INTO books (title, publisher_id, publish_date, available) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.title)
            .bind(input.publisher_id)
            .bind(input.publish_date)
            .bind(input.available)
            .execute(&mut *tx)
            .await
            .context("Failed to create book")?
            .last_id();
            insert_author_links!(tx, id, &input.author_ids);
            tx.commit().await.context("Failed to commit book")?;
            id
        });

        Ok(Book {
            id,
            title: input.title.clone(),
            publisher_id: input.publisher_id,
            publish_date: input.publish_date,
            available: input.available,
        })
    }

    async fn update(&self, id: i64, input: &BookInput) -> Result<Option<Book>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        with_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            sqlx::query(
                "UPDATE books SET title = ?, publisher_id = ?, publish_date = ?, available = ? WHERE id = ?",
            )
            .bind(&input.title)
            .bind(input.publisher_id)
            .bind(input.publish_date)
            .bind(input.available)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to update book")?;
            sqlx::query("DELETE FROM book_authors WHERE book_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to clear book authors")?;
            insert_author_links!(tx, id, &input.author_ids);
            tx.commit().await.context("Failed to commit book")?;
        });

        self.get(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM books WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete book")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar("SELECT COUNT(*) FROM books")
                .fetch_one(p)
                .await
                .context("Failed to count books")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        AuthorRepository, PublisherRepository, SqlxAuthorRepository, SqlxPublisherRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{AuthorInput, DateDrillDown, DateRange, PublisherInput};

    struct Fixture {
        books: Arc<dyn BookRepository>,
        authors: Arc<dyn AuthorRepository>,
        publishers: Arc<dyn PublisherRepository>,
        publisher_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let publishers = SqlxPublisherRepository::boxed(pool.clone());
        let publisher_id = publishers
            .create(
                &PublisherInput {
                    name: "Acme".into(),
                    address: String::new(),
                },
                &[],
            )
            .await
            .unwrap()
            .id;
        Fixture {
            books: SqlxBookRepository::boxed(pool.clone()),
            authors: SqlxAuthorRepository::boxed(pool),
            publishers,
            publisher_id,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book(f: &Fixture, title: &str, publish_date: Option<NaiveDate>) -> BookInput {
        BookInput {
            title: title.to_string(),
            publisher_id: f.publisher_id,
            publish_date,
            available: true,
            author_ids: vec![],
        }
    }

    async fn add_author(f: &Fixture, first: &str, last: &str) -> i64 {
        f.authors
            .create(&AuthorInput {
                first_name: first.into(),
                last_name: last.into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_with_authors_and_list_column() {
        let f = setup().await;
        let pratchett = add_author(&f, "Terry", "Pratchett").await;
        let gaiman = add_author(&f, "Neil", "Gaiman").await;

        let created = f
            .books
            .create(&BookInput {
                author_ids: vec![pratchett, gaiman],
                ..book(&f, "Good Omens", Some(date(1990, 5, 1)))
            })
            .await
            .unwrap();

        assert_eq!(
            f.books.author_ids(created.id).await.unwrap(),
            vec![pratchett, gaiman]
        );

        let page = f
            .books
            .list(&ListQuery::default(), &BookFilter::default(), date(2024, 1, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].authors, "Pratchett, Gaiman");
        assert_eq!(page.items[0].publisher_name, "Acme");
    }

    #[tokio::test]
    async fn test_update_replaces_authors() {
        let f = setup().await;
        let a = add_author(&f, "A", "Alpha").await;
        let b = add_author(&f, "B", "Beta").await;
        let created = f
            .books
            .create(&BookInput {
                author_ids: vec![a],
                ..book(&f, "T", None)
            })
            .await
            .unwrap();

        let updated = f
            .books
            .update(
                created.id,
                &BookInput {
                    author_ids: vec![b],
                    available: false,
                    ..book(&f, "T2", None)
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "T2");
        assert!(!updated.available);
        assert_eq!(f.books.author_ids(created.id).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_filters() {
        let f = setup().await;
        let today = date(2024, 6, 15);
        f.books.create(&book(&f, "Today", Some(today))).await.unwrap();
        f.books
            .create(&book(&f, "Last week", Some(date(2024, 6, 10))))
            .await
            .unwrap();
        f.books
            .create(&book(&f, "Old", Some(date(2019, 3, 2))))
            .await
            .unwrap();
        f.books.create(&book(&f, "Undated", None)).await.unwrap();

        let count = |range: DateRange| {
            let filter = BookFilter {
                date_range: Some(range),
                ..Default::default()
            };
            let books = f.books.clone();
            async move {
                books
                    .list(&ListQuery::default(), &filter, today)
                    .await
                    .unwrap()
                    .total
            }
        };

        assert_eq!(count(DateRange::Today).await, 1);
        assert_eq!(count(DateRange::Past7Days).await, 2);
        assert_eq!(count(DateRange::ThisMonth).await, 2);
        assert_eq!(count(DateRange::ThisYear).await, 2);
        assert_eq!(count(DateRange::NoDate).await, 1);
        assert_eq!(count(DateRange::HasDate).await, 3);

        let searched = f
            .books
            .list(&ListQuery::new(Some("old"), 1), &BookFilter::default(), today)
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
        assert_eq!(searched.items[0].title, "Old");
    }

    #[tokio::test]
    async fn test_publisher_filter() {
        let f = setup().await;
        let other = f
            .publishers
            .create(
                &PublisherInput {
                    name: "Other".into(),
                    address: String::new(),
                },
                &[],
            )
            .await
            .unwrap();
        f.books.create(&book(&f, "Mine", None)).await.unwrap();
        f.books
            .create(&BookInput {
                publisher_id: other.id,
                ..book(&f, "Theirs", None)
            })
            .await
            .unwrap();

        let filter = BookFilter {
            publisher_id: Some(other.id),
            ..Default::default()
        };
        let page = f
            .books
            .list(&ListQuery::default(), &filter, date(2024, 1, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Theirs");
    }

    #[tokio::test]
    async fn test_drill_down_and_publish_dates() {
        let f = setup().await;
        for d in [date(2020, 1, 5), date(2020, 1, 5), date(2020, 3, 9), date(2022, 7, 1)] {
            f.books.create(&book(&f, "B", Some(d))).await.unwrap();
        }
        f.books.create(&book(&f, "Undated", None)).await.unwrap();

        let today = date(2024, 1, 1);
        let dates = f
            .books
            .publish_dates(&ListQuery::default(), &BookFilter::default(), today)
            .await
            .unwrap();
        assert_eq!(dates, vec![date(2020, 1, 5), date(2020, 3, 9), date(2022, 7, 1)]);

        let filter = BookFilter {
            drill_down: DateDrillDown {
                year: Some(2020),
                month: Some(1),
                day: None,
            },
            ..Default::default()
        };
        let page = f
            .books
            .list(&ListQuery::default(), &filter, today)
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let impossible = BookFilter {
            drill_down: DateDrillDown {
                year: Some(2020),
                month: Some(13),
                day: None,
            },
            ..Default::default()
        };
        let page = f
            .books
            .list(&ListQuery::default(), &impossible, today)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_delete_book_keeps_authors() {
        let f = setup().await;
        let a = add_author(&f, "A", "Alpha").await;
        let created = f
            .books
            .create(&BookInput {
                author_ids: vec![a],
                ..book(&f, "T", None)
            })
            .await
            .unwrap();

        assert!(f.books.delete(created.id).await.unwrap());
        assert_eq!(f.books.count().await.unwrap(), 0);
        assert!(f.authors.get(a).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_publisher_rejected() {
        let f = setup().await;
        let result = f
            .books
            .create(&BookInput {
                publisher_id: 4242,
                ..book(&f, "Orphan", None)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(f.books.count().await.unwrap(), 0);
    }
}
