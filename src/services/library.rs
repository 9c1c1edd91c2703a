//! Library catalog service
//!
//! Backs the staff admin over publishers, authors and books: raw form
//! validation, changelist queries, the publish-date hierarchy and the
//! add/change/delete operations.

use crate::db::repositories::{AuthorRepository, BookRepository, PublisherRepository};
use crate::models::{
    Author, AuthorInput, Book, BookFilter, BookInput, BookSummary, DateDrillDown, InlineBookInput,
    LibraryModel, ListQuery, PagedResult, Publisher, PublisherInput,
};
use crate::services::validation::{self, messages, ValidationErrors};
use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Prefix of the publisher form's inline book fields
pub const INLINE_PREFIX: &str = "books";

/// Error types for library operations
#[derive(Debug, thiserror::Error)]
pub enum LibraryServiceError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for LibraryServiceError {
    fn from(errors: ValidationErrors) -> Self {
        LibraryServiceError::Validation(errors)
    }
}

type LibraryResult<T> = Result<T, LibraryServiceError>;

/// Raw publisher change form
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublisherForm {
    pub name: String,
    pub address: String,
    pub books: Vec<InlineBookForm>,
}

/// Raw row of the inline books table
#[derive(Debug, Clone, Default, Serialize)]
pub struct InlineBookForm {
    pub id: Option<String>,
    pub title: String,
    pub publish_date: String,
    pub available: bool,
    pub delete: bool,
}

impl InlineBookForm {
    /// An extra row the user left untouched
    fn is_blank_extra(&self) -> bool {
        self.id.as_deref().map_or(true, |id| id.trim().is_empty())
            && self.title.trim().is_empty()
            && self.publish_date.trim().is_empty()
    }
}

/// Raw author change form
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthorForm {
    pub first_name: String,
    pub last_name: String,
}

/// Raw book change form
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookForm {
    pub title: String,
    /// Publisher primary key as typed into the raw id field
    pub publisher: String,
    pub publish_date: String,
    pub available: bool,
    pub authors: Vec<String>,
}

impl From<&Publisher> for PublisherForm {
    fn from(publisher: &Publisher) -> Self {
        Self {
            name: publisher.name.clone(),
            address: publisher.address.clone(),
            books: Vec::new(),
        }
    }
}

impl From<&Book> for InlineBookForm {
    fn from(book: &Book) -> Self {
        Self {
            id: Some(book.id.to_string()),
            title: book.title.clone(),
            publish_date: format_date(book.publish_date),
            available: book.available,
            delete: false,
        }
    }
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        Self {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
        }
    }
}

impl BookForm {
    pub fn from_book(book: &Book, author_ids: &[i64]) -> Self {
        Self {
            title: book.title.clone(),
            publisher: book.publisher_id.to_string(),
            publish_date: format_date(book.publish_date),
            available: book.available,
            authors: author_ids.iter().map(i64::to_string).collect(),
        }
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Field name of an inline book cell, e.g. `books-0-title`
pub fn inline_field(index: usize, field: &str) -> String {
    format!("{}-{}-{}", INLINE_PREFIX, index, field)
}

/// One link of the date hierarchy bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateLink {
    pub label: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateLink {
    fn new(label: String, drill: DateDrillDown) -> Self {
        Self {
            label,
            year: drill.year,
            month: drill.month,
            day: drill.day,
        }
    }
}

/// Year, then month, then day navigation over publish dates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateHierarchy {
    /// Link one level up, absent at the top
    pub back: Option<DateLink>,
    pub choices: Vec<DateLink>,
}

impl DateHierarchy {
    /// Build the navigation for `drill` from the matching publish dates
    pub fn build(dates: &[NaiveDate], drill: DateDrillDown) -> Self {
        let Some(year) = drill.year else {
            let years: BTreeSet<i32> = dates.iter().map(|d| d.year()).collect();
            let choices = years
                .into_iter()
                .map(|y| DateLink::new(y.to_string(), DateDrillDown { year: Some(y), ..Default::default() }))
                .collect();
            return Self { back: None, choices };
        };

        let in_year = dates.iter().filter(|d| d.year() == year);
        let back_to_all = DateLink::new("‹ All dates".to_string(), DateDrillDown::default());

        let Some(month) = drill.month else {
            let months: BTreeSet<u32> = in_year.map(|d| d.month()).collect();
            let choices = months
                .into_iter()
                .filter_map(|m| {
                    let first = NaiveDate::from_ymd_opt(year, m, 1)?;
                    Some(DateLink::new(
                        first.format("%B %Y").to_string(),
                        DateDrillDown { year: Some(year), month: Some(m), day: None },
                    ))
                })
                .collect();
            return Self { back: Some(back_to_all), choices };
        };

        let back_to_year = DateLink::new(
            format!("‹ {}", year),
            DateDrillDown { year: Some(year), ..Default::default() },
        );
        let days: BTreeSet<NaiveDate> = in_year.filter(|d| d.month() == month).copied().collect();
        let day_link = |d: NaiveDate| {
            DateLink::new(
                d.format("%B %-d").to_string(),
                DateDrillDown { year: Some(year), month: Some(month), day: Some(d.day()) },
            )
        };

        match drill.day {
            None => Self {
                back: Some(back_to_year),
                choices: days.into_iter().map(day_link).collect(),
            },
            Some(day) => {
                let back_to_month = NaiveDate::from_ymd_opt(year, month, 1).map(|first| {
                    DateLink::new(
                        format!("‹ {}", first.format("%B %Y")),
                        DateDrillDown { year: Some(year), month: Some(month), day: None },
                    )
                });
                let choices = days.into_iter().filter(|d| d.day() == day).map(day_link).collect();
                Self {
                    back: back_to_month.or(Some(back_to_year)),
                    choices,
                }
            }
        }
    }
}

/// Library catalog service
pub struct LibraryService {
    publishers: Arc<dyn PublisherRepository>,
    authors: Arc<dyn AuthorRepository>,
    books: Arc<dyn BookRepository>,
}

impl LibraryService {
    pub fn new(
        publishers: Arc<dyn PublisherRepository>,
        authors: Arc<dyn AuthorRepository>,
        books: Arc<dyn BookRepository>,
    ) -> Self {
        Self {
            publishers,
            authors,
            books,
        }
    }

    /// Row count per registered model, in admin index order
    pub async fn counts(&self) -> LibraryResult<Vec<(LibraryModel, i64)>> {
        let mut counts = Vec::with_capacity(LibraryModel::ALL.len());
        for model in LibraryModel::ALL {
            let count = match model {
                LibraryModel::Publisher => self.publishers.count().await,
                LibraryModel::Author => self.authors.count().await,
                LibraryModel::Book => self.books.count().await,
            }
            .context("Failed to count rows")?;
            counts.push((model, count));
        }
        Ok(counts)
    }

    // ========================================================================
    // Publishers
    // ========================================================================

    pub async fn list_publishers(
        &self,
        query: &ListQuery,
        name: Option<&str>,
    ) -> LibraryResult<PagedResult<Publisher>> {
        Ok(self
            .publishers
            .list(query, name)
            .await
            .context("Failed to list publishers")?)
    }

    /// Values for the publisher name sidebar filter
    pub async fn publisher_names(&self) -> LibraryResult<Vec<String>> {
        Ok(self
            .publishers
            .distinct_names()
            .await
            .context("Failed to list publisher names")?)
    }

    pub async fn all_publishers(&self) -> LibraryResult<Vec<Publisher>> {
        Ok(self
            .publishers
            .list_all()
            .await
            .context("Failed to list publishers")?)
    }

    pub async fn get_publisher(&self, id: i64) -> LibraryResult<Publisher> {
        self.publishers
            .get(id)
            .await
            .context("Failed to get publisher")?
            .ok_or(LibraryServiceError::NotFound)
    }

    /// Books owned by a publisher, for the inline table and delete preview
    pub async fn publisher_books(&self, id: i64) -> LibraryResult<Vec<Book>> {
        Ok(self
            .publishers
            .books(id)
            .await
            .context("Failed to list publisher books")?)
    }

    pub async fn create_publisher(&self, form: &PublisherForm) -> LibraryResult<Publisher> {
        let (input, books) = validate_publisher(form)?;
        let publisher = self
            .publishers
            .create(&input, &books)
            .await
            .context("Failed to create publisher")?;
        tracing::info!(publisher_id = publisher.id, "publisher added");
        Ok(publisher)
    }

    pub async fn update_publisher(&self, id: i64, form: &PublisherForm) -> LibraryResult<Publisher> {
        let (input, books) = validate_publisher(form)?;
        self.publishers
            .update(id, &input, &books)
            .await
            .context("Failed to update publisher")?
            .ok_or(LibraryServiceError::NotFound)
    }

    /// Delete a publisher together with its books
    pub async fn delete_publisher(&self, id: i64) -> LibraryResult<()> {
        let removed = self
            .publishers
            .delete(id)
            .await
            .context("Failed to delete publisher")?;
        if !removed {
            return Err(LibraryServiceError::NotFound);
        }
        tracing::info!(publisher_id = id, "publisher deleted");
        Ok(())
    }

    // ========================================================================
    // Authors
    // ========================================================================

    pub async fn list_authors(&self, query: &ListQuery) -> LibraryResult<PagedResult<Author>> {
        Ok(self
            .authors
            .list(query)
            .await
            .context("Failed to list authors")?)
    }

    /// Every author ordered by last name, for the book form's multi-select
    pub async fn all_authors(&self) -> LibraryResult<Vec<Author>> {
        Ok(self
            .authors
            .list_all()
            .await
            .context("Failed to list authors")?)
    }

    pub async fn get_author(&self, id: i64) -> LibraryResult<Author> {
        self.authors
            .get(id)
            .await
            .context("Failed to get author")?
            .ok_or(LibraryServiceError::NotFound)
    }

    pub async fn create_author(&self, form: &AuthorForm) -> LibraryResult<Author> {
        let input = validate_author(form)?;
        Ok(self
            .authors
            .create(&input)
            .await
            .context("Failed to create author")?)
    }

    pub async fn update_author(&self, id: i64, form: &AuthorForm) -> LibraryResult<Author> {
        let input = validate_author(form)?;
        self.authors
            .update(id, &input)
            .await
            .context("Failed to update author")?
            .ok_or(LibraryServiceError::NotFound)
    }

    pub async fn delete_author(&self, id: i64) -> LibraryResult<()> {
        let removed = self
            .authors
            .delete(id)
            .await
            .context("Failed to delete author")?;
        if removed {
            Ok(())
        } else {
            Err(LibraryServiceError::NotFound)
        }
    }

    // ========================================================================
    // Books
    // ========================================================================

    pub async fn list_books(
        &self,
        query: &ListQuery,
        filter: &BookFilter,
        today: NaiveDate,
    ) -> LibraryResult<PagedResult<BookSummary>> {
        Ok(self
            .books
            .list(query, filter, today)
            .await
            .context("Failed to list books")?)
    }

    /// Date navigation for the books changelist under the current filters
    pub async fn date_hierarchy(
        &self,
        query: &ListQuery,
        filter: &BookFilter,
        today: NaiveDate,
    ) -> LibraryResult<DateHierarchy> {
        let dates = self
            .books
            .publish_dates(query, filter, today)
            .await
            .context("Failed to list publish dates")?;
        Ok(DateHierarchy::build(&dates, filter.drill_down))
    }

    /// A book and the ids of its authors
    pub async fn get_book(&self, id: i64) -> LibraryResult<(Book, Vec<i64>)> {
        let book = self
            .books
            .get(id)
            .await
            .context("Failed to get book")?
            .ok_or(LibraryServiceError::NotFound)?;
        let author_ids = self
            .books
            .author_ids(id)
            .await
            .context("Failed to get book authors")?;
        Ok((book, author_ids))
    }

    pub async fn create_book(&self, form: &BookForm) -> LibraryResult<Book> {
        let input = self.validate_book(form).await?;
        let book = self
            .books
            .create(&input)
            .await
            .context("Failed to create book")?;
        tracing::info!(book_id = book.id, "book added");
        Ok(book)
    }

    pub async fn update_book(&self, id: i64, form: &BookForm) -> LibraryResult<Book> {
        let input = self.validate_book(form).await?;
        self.books
            .update(id, &input)
            .await
            .context("Failed to update book")?
            .ok_or(LibraryServiceError::NotFound)
    }

    pub async fn delete_book(&self, id: i64) -> LibraryResult<()> {
        let removed = self
            .books
            .delete(id)
            .await
            .context("Failed to delete book")?;
        if removed {
            Ok(())
        } else {
            Err(LibraryServiceError::NotFound)
        }
    }

    /// Field checks plus existence of the referenced publisher and authors
    async fn validate_book(&self, form: &BookForm) -> LibraryResult<BookInput> {
        let mut errors = ValidationErrors::new();

        let title = errors.check("title", validation::text(&form.title, 200, Some(messages::REQUIRED)));
        let publish_date = errors
            .check("publish_date", validation::optional_date(&form.publish_date))
            .flatten();

        let mut publisher_id = None;
        if form.publisher.trim().is_empty() {
            errors.add("publisher", messages::REQUIRED);
        } else if let Some(id) = errors.check("publisher", validation::positive_id(&form.publisher)) {
            let exists = self
                .publishers
                .get(id)
                .await
                .context("Failed to look up publisher")?
                .is_some();
            if exists {
                publisher_id = Some(id);
            } else {
                errors.add("publisher", messages::INVALID_CHOICE);
            }
        }

        let mut author_ids = Vec::new();
        for raw in form.authors.iter().filter(|a| !a.trim().is_empty()) {
            let known = match raw.trim().parse::<i64>() {
                Ok(id) => self
                    .authors
                    .get(id)
                    .await
                    .context("Failed to look up author")?
                    .map(|a| a.id),
                Err(_) => None,
            };
            match known {
                Some(id) if !author_ids.contains(&id) => author_ids.push(id),
                Some(_) => {}
                None => {
                    errors.add(
                        "authors",
                        format!("Select a valid choice. {} is not one of the available choices.", raw.trim()),
                    );
                    break;
                }
            }
        }
        if author_ids.is_empty() && !errors.contains("authors") {
            errors.add("authors", messages::REQUIRED);
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }
        Ok(BookInput {
            title: title.unwrap_or_default(),
            publisher_id: publisher_id.unwrap_or_default(),
            publish_date,
            available: form.available,
            author_ids,
        })
    }
}

fn validate_author(form: &AuthorForm) -> Result<AuthorInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let first_name = errors.check(
        "first_name",
        validation::text(&form.first_name, 50, Some(messages::REQUIRED)),
    );
    let last_name = errors.check(
        "last_name",
        validation::text(&form.last_name, 50, Some(messages::REQUIRED)),
    );
    errors.into_result(())?;
    Ok(AuthorInput {
        first_name: first_name.unwrap_or_default(),
        last_name: last_name.unwrap_or_default(),
    })
}

/// Validate the publisher fields and its inline book rows.
///
/// Untouched extra rows are skipped and rows marked for deletion are not
/// validated. Inline errors are keyed `books-<index>-<field>`.
fn validate_publisher(
    form: &PublisherForm,
) -> Result<(PublisherInput, Vec<InlineBookInput>), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = errors.check("name", validation::text(&form.name, 100, Some(messages::REQUIRED)));
    let address = errors.check("address", validation::text(&form.address, 200, None));

    let mut books = Vec::new();
    for (index, row) in form.books.iter().enumerate() {
        if row.is_blank_extra() {
            continue;
        }

        let id = match row.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match errors.check(&inline_field(index, "id"), validation::positive_id(raw)) {
                Some(id) => Some(id),
                None => continue,
            },
            None => None,
        };

        if row.delete {
            if id.is_some() {
                books.push(InlineBookInput {
                    id,
                    delete: true,
                    ..Default::default()
                });
            }
            continue;
        }

        let title = errors.check(
            &inline_field(index, "title"),
            validation::text(&row.title, 200, Some(messages::REQUIRED)),
        );
        let publish_date = errors.check(
            &inline_field(index, "publish_date"),
            validation::optional_date(&row.publish_date),
        );
        if let (Some(title), Some(publish_date)) = (title, publish_date) {
            books.push(InlineBookInput {
                id,
                title,
                publish_date,
                available: row.available,
                delete: false,
            });
        }
    }

    errors.into_result(())?;
    Ok((
        PublisherInput {
            name: name.unwrap_or_default(),
            address: address.unwrap_or_default(),
        },
        books,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAuthorRepository, SqlxBookRepository, SqlxPublisherRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> LibraryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        LibraryService::new(
            SqlxPublisherRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool.clone()),
            SqlxBookRepository::boxed(pool),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn publisher_form(name: &str) -> PublisherForm {
        PublisherForm {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            books: Vec::new(),
        }
    }

    fn book_form(title: &str, publisher: i64, authors: &[i64]) -> BookForm {
        BookForm {
            title: title.to_string(),
            publisher: publisher.to_string(),
            publish_date: "2020-05-01".to_string(),
            available: true,
            authors: authors.iter().map(i64::to_string).collect(),
        }
    }

    async fn author(service: &LibraryService, first: &str, last: &str) -> Author {
        service
            .create_author(&AuthorForm {
                first_name: first.to_string(),
                last_name: last.to_string(),
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_validate_publisher_inline_rows() {
        let form = PublisherForm {
            name: "Penguin".into(),
            address: String::new(),
            books: vec![
                InlineBookForm {
                    title: "New".into(),
                    available: true,
                    ..Default::default()
                },
                InlineBookForm {
                    id: Some("4".into()),
                    delete: true,
                    ..Default::default()
                },
                // untouched extra row
                InlineBookForm {
                    available: true,
                    ..Default::default()
                },
            ],
        };
        let (input, books) = validate_publisher(&form).unwrap();
        assert_eq!(input.name, "Penguin");
        assert_eq!(books.len(), 2);
        assert!(books[1].delete);
        assert_eq!(books[1].id, Some(4));
    }

    #[test]
    fn test_validate_publisher_errors() {
        let form = PublisherForm {
            name: " ".into(),
            address: "a".repeat(201),
            books: vec![InlineBookForm {
                id: Some("2".into()),
                title: String::new(),
                publish_date: "not a date".into(),
                ..Default::default()
            }],
        };
        let errors = validate_publisher(&form).unwrap_err();
        assert_eq!(errors.get("name").unwrap(), &[messages::REQUIRED.to_string()]);
        assert_eq!(errors.get("address").unwrap(), &[messages::max_length(200)]);
        assert!(errors.contains("books-0-title"));
        assert_eq!(
            errors.get("books-0-publish_date").unwrap(),
            &[messages::INVALID_DATE.to_string()]
        );
    }

    #[test]
    fn test_date_hierarchy_levels() {
        let dates = [date(2019, 3, 1), date(2020, 1, 5), date(2020, 1, 20), date(2020, 6, 2)];

        let top = DateHierarchy::build(&dates, DateDrillDown::default());
        assert!(top.back.is_none());
        let years: Vec<_> = top.choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(years, ["2019", "2020"]);

        let year = DateHierarchy::build(&dates, DateDrillDown { year: Some(2020), ..Default::default() });
        let months: Vec<_> = year.choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(months, ["January 2020", "June 2020"]);
        assert_eq!(year.back.unwrap().year, None);

        let month = DateHierarchy::build(
            &dates,
            DateDrillDown { year: Some(2020), month: Some(1), day: None },
        );
        let days: Vec<_> = month.choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(days, ["January 5", "January 20"]);
        assert_eq!(month.back.unwrap().year, Some(2020));

        let day = DateHierarchy::build(
            &dates,
            DateDrillDown { year: Some(2020), month: Some(1), day: Some(20) },
        );
        assert_eq!(day.choices.len(), 1);
        assert_eq!(day.choices[0].day, Some(20));
        assert_eq!(day.back.unwrap().month, Some(1));
    }

    #[tokio::test]
    async fn test_book_requires_existing_publisher_and_authors() {
        let service = setup().await;
        let publisher = service.create_publisher(&publisher_form("Acme")).await.unwrap();

        let err = service.create_book(&book_form("T", 999, &[])).await.unwrap_err();
        let LibraryServiceError::Validation(errors) = err else { panic!("expected validation") };
        assert_eq!(errors.get("publisher").unwrap(), &[messages::INVALID_CHOICE.to_string()]);

        let err = service.create_book(&book_form("T", publisher.id, &[42])).await.unwrap_err();
        let LibraryServiceError::Validation(errors) = err else { panic!("expected validation") };
        assert!(errors.contains("authors"));

        let err = service.create_book(&book_form("T", publisher.id, &[])).await.unwrap_err();
        let LibraryServiceError::Validation(errors) = err else { panic!("expected validation") };
        assert_eq!(errors.get("authors").unwrap(), &[messages::REQUIRED.to_string()]);

        let mut blank = book_form("", publisher.id, &[]);
        blank.publisher = String::new();
        let err = service.create_book(&blank).await.unwrap_err();
        let LibraryServiceError::Validation(errors) = err else { panic!("expected validation") };
        assert!(errors.contains("title"));
        assert_eq!(errors.get("publisher").unwrap(), &[messages::REQUIRED.to_string()]);
    }

    #[tokio::test]
    async fn test_book_round_trip_with_authors() {
        let service = setup().await;
        let publisher = service.create_publisher(&publisher_form("Acme")).await.unwrap();
        let a = author(&service, "Ada", "Lovelace").await;
        let b = author(&service, "Alan", "Turing").await;

        let book = service
            .create_book(&book_form("Notes", publisher.id, &[a.id, b.id]))
            .await
            .unwrap();
        let (stored, author_ids) = service.get_book(book.id).await.unwrap();
        assert_eq!(stored.publish_date, Some(date(2020, 5, 1)));
        assert_eq!(author_ids, vec![a.id, b.id]);

        service
            .update_book(book.id, &book_form("Notes 2", publisher.id, &[b.id]))
            .await
            .unwrap();
        let (_, author_ids) = service.get_book(book.id).await.unwrap();
        assert_eq!(author_ids, vec![b.id]);
    }

    #[tokio::test]
    async fn test_delete_publisher_cascades_to_books_only() {
        let service = setup().await;
        let publisher = service.create_publisher(&publisher_form("Acme")).await.unwrap();
        let a = author(&service, "Ada", "Lovelace").await;
        service
            .create_book(&book_form("Notes", publisher.id, &[a.id]))
            .await
            .unwrap();

        service.delete_publisher(publisher.id).await.unwrap();

        let counts = service.counts().await.unwrap();
        assert!(counts.contains(&(LibraryModel::Book, 0)));
        assert!(counts.contains(&(LibraryModel::Publisher, 0)));
        assert!(counts.contains(&(LibraryModel::Author, 1)));

        assert!(matches!(
            service.delete_publisher(publisher.id).await,
            Err(LibraryServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_publisher_inline_books_saved() {
        let service = setup().await;
        let mut form = publisher_form("Acme");
        form.books.push(InlineBookForm {
            title: "Inline".into(),
            publish_date: "2021-02-03".into(),
            available: false,
            ..Default::default()
        });
        let publisher = service.create_publisher(&form).await.unwrap();

        let books = service.publisher_books(publisher.id).await.unwrap();
        assert_eq!(books.len(), 1);
        assert!(!books[0].available);

        let mut edit = PublisherForm::from(&publisher);
        let mut row = InlineBookForm::from(&books[0]);
        row.delete = true;
        edit.books.push(row);
        service.update_publisher(publisher.id, &edit).await.unwrap();
        assert!(service.publisher_books(publisher.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_date_hierarchy_from_books() {
        let service = setup().await;
        let publisher = service.create_publisher(&publisher_form("Acme")).await.unwrap();
        let writer = author(&service, "Ada", "Lovelace").await;
        for day in ["2020-05-01", "2021-07-04"] {
            let mut form = book_form("B", publisher.id, &[writer.id]);
            form.publish_date = day.to_string();
            service.create_book(&form).await.unwrap();
        }

        let hierarchy = service
            .date_hierarchy(&ListQuery::default(), &BookFilter::default(), date(2022, 1, 1))
            .await
            .unwrap();
        assert_eq!(hierarchy.choices.len(), 2);
        assert_eq!(hierarchy.choices[0].year, Some(2020));
    }
}
