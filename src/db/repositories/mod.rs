//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod author;
pub mod book;
pub mod photo;
pub mod publisher;
pub mod session;
pub mod todo;
pub mod user;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use book::{BookRepository, SqlxBookRepository};
pub use photo::{PhotoRepository, SqlxPhotoRepository};
pub use publisher::{PublisherRepository, SqlxPublisherRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use todo::{SqlxTodoRepository, TodoRepository};
pub use user::{SqlxUserRepository, UserRepository};

use chrono::NaiveDate;

/// A value bound to a dynamically built query
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

/// Escape character for `LIKE` patterns.
///
/// A backslash would need different literal quoting on SQLite and MySQL.
const LIKE_ESCAPE: char = '!';

/// Make `value` match only itself inside a `LIKE` pattern
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Accumulates `WHERE` conditions together with their bind values
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every term must match at least one of `fields`, case-insensitively.
    ///
    /// Terms are matched literally: `%` and `_` in a term are escaped.
    pub fn search(&mut self, terms: &[String], fields: &[&str]) {
        if fields.is_empty() {
            return;
        }
        for term in terms {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            let ors: Vec<String> = fields
                .iter()
                .map(|field| format!("LOWER({}) LIKE ? ESCAPE '{}'", field, LIKE_ESCAPE))
                .collect();
            self.conditions.push(format!("({})", ors.join(" OR ")));
            for _ in fields {
                self.binds.push(BindValue::Text(pattern.clone()));
            }
        }
    }

    /// Add a condition with as many `?` placeholders as `binds`
    pub fn push(&mut self, condition: &str, binds: impl IntoIterator<Item = BindValue>) {
        self.conditions.push(condition.to_string());
        self.binds.extend(binds);
    }

    /// The clause text, empty when there are no conditions
    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

/// Bind every [`BindValue`] in order onto a `Query`/`QueryAs`/`QueryScalar`.
macro_rules! bind_all {
    ($query:expr, $binds:expr) => {{
        let mut query = $query;
        for value in $binds {
            query = match value {
                $crate::db::repositories::BindValue::Int(v) => query.bind(*v),
                $crate::db::repositories::BindValue::Text(v) => query.bind(v.clone()),
                $crate::db::repositories::BindValue::Date(v) => query.bind(*v),
            };
        }
        query
    }};
}
pub(crate) use bind_all;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_where_clause() {
        let clause = WhereClause::new();
        assert_eq!(clause.sql(), "");
        assert!(clause.binds().is_empty());
    }

    #[test]
    fn test_search_terms_are_anded_fields_ored() {
        let mut clause = WhereClause::new();
        clause.search(
            &["Le".to_string(), "Guin".to_string()],
            &["first_name", "last_name"],
        );

        assert_eq!(
            clause.sql(),
            " WHERE (LOWER(first_name) LIKE ? ESCAPE '!' OR LOWER(last_name) LIKE ? ESCAPE '!') \
             AND (LOWER(first_name) LIKE ? ESCAPE '!' OR LOWER(last_name) LIKE ? ESCAPE '!')"
        );
        assert_eq!(
            clause.binds(),
            &[
                BindValue::Text("%le%".into()),
                BindValue::Text("%le%".into()),
                BindValue::Text("%guin%".into()),
                BindValue::Text("%guin%".into()),
            ]
        );
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        assert_eq!(escape_like("50%_off!"), "50!%!_off!!");

        let mut clause = WhereClause::new();
        clause.search(&["100%".to_string()], &["title"]);
        assert_eq!(clause.binds(), &[BindValue::Text("%100!%%".into())]);
    }

    #[test]
    fn test_push_condition() {
        let mut clause = WhereClause::new();
        clause.push("publisher_id = ?", [BindValue::Int(4)]);
        clause.push("publish_date IS NULL", []);
        assert_eq!(clause.sql(), " WHERE publisher_id = ? AND publish_date IS NULL");
        assert_eq!(clause.binds(), &[BindValue::Int(4)]);
    }
}
