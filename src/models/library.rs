//! Library catalog models
//!
//! Publishers own books; books and authors are linked many-to-many through
//! `book_authors`. The admin changelist types (filters, date ranges, paging)
//! live here as well since they are plain data shared between the repository
//! and the admin handlers.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows shown per changelist page
pub const LIST_PER_PAGE: i64 = 100;

/// A book publisher
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    pub address: String,
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A book author
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// A book row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publisher_id: i64,
    pub publish_date: Option<NaiveDate>,
    pub available: bool,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A book as shown on the books changelist
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub publish_date: Option<NaiveDate>,
    pub publisher_id: i64,
    pub publisher_name: String,
    /// Comma-joined author last names, filled after the row query
    #[sqlx(default)]
    pub authors: String,
}

/// Validated publisher fields
#[derive(Debug, Clone, Default)]
pub struct PublisherInput {
    pub name: String,
    pub address: String,
}

/// Validated author fields
#[derive(Debug, Clone, Default)]
pub struct AuthorInput {
    pub first_name: String,
    pub last_name: String,
}

/// Validated book fields
#[derive(Debug, Clone, Default)]
pub struct BookInput {
    pub title: String,
    pub publisher_id: i64,
    pub publish_date: Option<NaiveDate>,
    pub available: bool,
    pub author_ids: Vec<i64>,
}

/// One validated row of the publisher's inline book table
#[derive(Debug, Clone, Default)]
pub struct InlineBookInput {
    /// Existing book id, `None` for the extra row
    pub id: Option<i64>,
    pub title: String,
    pub publish_date: Option<NaiveDate>,
    pub available: bool,
    pub delete: bool,
}

/// Models registered with the admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryModel {
    Publisher,
    Author,
    Book,
}

impl LibraryModel {
    pub const ALL: [LibraryModel; 3] = [
        LibraryModel::Author,
        LibraryModel::Book,
        LibraryModel::Publisher,
    ];

    /// Resolve a URL segment such as `book`
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "publisher" => Some(Self::Publisher),
            "author" => Some(Self::Author),
            "book" => Some(Self::Book),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Publisher => "publisher",
            Self::Author => "author",
            Self::Book => "book",
        }
    }

    pub fn verbose_name(self) -> &'static str {
        self.slug()
    }

    pub fn verbose_name_plural(self) -> &'static str {
        match self {
            Self::Publisher => "publishers",
            Self::Author => "authors",
            Self::Book => "books",
        }
    }
}

/// Relative publish-date ranges offered by the books sidebar filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateRange {
    Today,
    Past7Days,
    ThisMonth,
    ThisYear,
    NoDate,
    HasDate,
}

/// How a [`DateRange`] constrains the column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBounds {
    /// `start <= date < end`
    Between(NaiveDate, NaiveDate),
    IsNull,
    NotNull,
}

impl DateRange {
    pub const ALL: [DateRange; 6] = [
        DateRange::Today,
        DateRange::Past7Days,
        DateRange::ThisMonth,
        DateRange::ThisYear,
        DateRange::NoDate,
        DateRange::HasDate,
    ];

    pub fn from_param(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_param() == value)
    }

    pub fn as_param(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Past7Days => "past_7_days",
            Self::ThisMonth => "this_month",
            Self::ThisYear => "this_year",
            Self::NoDate => "no_date",
            Self::HasDate => "has_date",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Past7Days => "Past 7 days",
            Self::ThisMonth => "This month",
            Self::ThisYear => "This year",
            Self::NoDate => "No date",
            Self::HasDate => "Has date",
        }
    }

    /// Resolve the range against `today`
    pub fn bounds(self, today: NaiveDate) -> DateBounds {
        let tomorrow = today + Duration::days(1);
        match self {
            Self::Today => DateBounds::Between(today, tomorrow),
            Self::Past7Days => DateBounds::Between(today - Duration::days(7), tomorrow),
            Self::ThisMonth => {
                let start = today.with_day(1).unwrap_or(today);
                DateBounds::Between(start, next_month(start))
            }
            Self::ThisYear => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let end = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(tomorrow);
                DateBounds::Between(start, end)
            }
            Self::NoDate => DateBounds::IsNull,
            Self::HasDate => DateBounds::NotNull,
        }
    }
}

/// First day of the month after `first_of_month`
pub fn next_month(first_of_month: NaiveDate) -> NaiveDate {
    let (year, month) = if first_of_month.month() == 12 {
        (first_of_month.year() + 1, 1)
    } else {
        (first_of_month.year(), first_of_month.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first_of_month)
}

/// Date-hierarchy selection on `publish_date` (year, then month, then day)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateDrillDown {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateDrillDown {
    /// The half-open date interval selected, if any.
    ///
    /// Month and day are ignored unless every coarser level is set. Values
    /// that do not form a calendar date select nothing.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let year = self.year?;
        let Some(month) = self.month else {
            let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
            let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
            return Some((start, end));
        };
        let Some(day) = self.day else {
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some((start, next_month(start)));
        };
        let start = NaiveDate::from_ymd_opt(year, month, day)?;
        Some((start, start + Duration::days(1)))
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none()
    }
}

/// Filters for the books changelist
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub publisher_id: Option<i64>,
    pub date_range: Option<DateRange>,
    pub drill_down: DateDrillDown,
}

/// Common changelist query: search terms and 1-based page
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub terms: Vec<String>,
    pub page: i64,
}

impl ListQuery {
    /// Split a raw search string into terms
    pub fn new(search: Option<&str>, page: i64) -> Self {
        let terms = search
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self {
            terms,
            page: page.max(1),
        }
    }

    /// Row offset of the page; past the last row for out-of-range pages
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(LIST_PER_PAGE)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(None, 1)
    }
}

/// Paginated result
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Number of rows matching the search and filters
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: i64,
    /// Number of items per page
    pub per_page: i64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, query: &ListQuery) -> Self {
        Self {
            items,
            total,
            page: query.page,
            per_page: LIST_PER_PAGE,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> i64 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total + self.per_page - 1) / self.per_page).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}
