//! Database migrations module
//!
//! All migrations are embedded directly in Rust code as SQL strings, one
//! variant per driver, so the server ships as a single binary.
//!
//! # Usage
//!
//! ```ignore
//! use workbench::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Each migration is a [`Migration`] containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_sqlite`: SQL for SQLite database
//! - `up_mysql`: SQL for MySQL database

use anyhow::{Context, Result};
use sqlx::Row;

use super::pool::with_pool;
use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
}

/// All migrations, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(254) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                avatar VARCHAR(255),
                is_staff BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(254) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                avatar VARCHAR(255),
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_todos",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name VARCHAR(200) NOT NULL,
                state BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_todos_user_id ON todos(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS todos (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                name VARCHAR(200) NOT NULL,
                state BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_todos_user_id ON todos(user_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_publishers",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS publishers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                address VARCHAR(200) NOT NULL DEFAULT ''
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS publishers (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL,
                address VARCHAR(200) NOT NULL DEFAULT ''
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_authors",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name VARCHAR(50) NOT NULL,
                last_name VARCHAR(50) NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_authors_last_name ON authors(last_name);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS authors (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                first_name VARCHAR(50) NOT NULL,
                last_name VARCHAR(50) NOT NULL
            );
            CREATE INDEX idx_authors_last_name ON authors(last_name);
        "#,
    },
    Migration {
        version: 6,
        name: "create_books",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                publisher_id INTEGER NOT NULL,
                publish_date DATE,
                available BOOLEAN NOT NULL DEFAULT 1,
                FOREIGN KEY (publisher_id) REFERENCES publishers(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_books_publisher_id ON books(publisher_id);
            CREATE INDEX IF NOT EXISTS idx_books_publish_date ON books(publish_date);
            CREATE TABLE IF NOT EXISTS book_authors (
                book_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                PRIMARY KEY (book_id, author_id),
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_book_authors_author_id ON book_authors(author_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS books (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(200) NOT NULL,
                publisher_id BIGINT NOT NULL,
                publish_date DATE,
                available BOOLEAN NOT NULL DEFAULT TRUE,
                FOREIGN KEY (publisher_id) REFERENCES publishers(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_books_publish_date ON books(publish_date);
            CREATE TABLE IF NOT EXISTS book_authors (
                book_id BIGINT NOT NULL,
                author_id BIGINT NOT NULL,
                PRIMARY KEY (book_id, author_id),
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_photos",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS photos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(100) NOT NULL DEFAULT '',
                image VARCHAR(255) NOT NULL,
                uploaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_photos_uploaded_at ON photos(uploaded_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS photos (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(100) NOT NULL DEFAULT '',
                image VARCHAR(255) NOT NULL,
                uploaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_photos_uploaded_at ON photos(uploaded_at);
        "#,
    },
];

/// Run all pending migrations
///
/// This function:
/// 1. Creates the migrations tracking table if it doesn't exist
/// 2. Checks which migrations have already been applied
/// 3. Runs any pending migrations in order
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i64> = applied.iter().map(|m| m.version).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&i64::from(migration.version)) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    with_pool!(pool, |p| {
        let rows = sqlx::query("SELECT version, name FROM _migrations ORDER BY version")
            .fetch_all(p)
            .await
            .context("Failed to read applied migrations")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(MigrationRecord {
                version: row.try_get("version")?,
                name: row.try_get("name")?,
            });
        }
        Ok(records)
    })
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    with_pool!(pool, |p| {
        for statement in split_sql_statements(sql) {
            sqlx::query(statement)
                .execute(p)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }

        sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
            .bind(i64::from(migration.version))
            .bind(migration.name)
            .execute(p)
            .await
            .context("Failed to record migration")?;

        Ok(())
    })
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, MIGRATIONS.len());

        // Running again should apply 0 migrations
        let count = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_is_up_to_date_and_pending_count() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        assert!(!is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());

        run_migrations(&pool).await.expect("Failed to run migrations");

        assert!(is_up_to_date(&pool).await.unwrap());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_defaults() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind("alice")
            .bind("hash")
            .execute(sqlite_pool)
            .await
            .expect("Failed to insert user");

        let row = sqlx::query("SELECT email, avatar, is_staff FROM users WHERE username = 'alice'")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        let email: String = row.get("email");
        let avatar: Option<String> = row.get("avatar");
        let is_staff: bool = row.get("is_staff");
        assert_eq!(email, "");
        assert!(avatar.is_none());
        assert!(!is_staff);
    }

    #[tokio::test]
    async fn test_unique_username() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let insert = "INSERT INTO users (username, password_hash) VALUES (?, ?)";
        sqlx::query(insert)
            .bind("bob")
            .bind("h1")
            .execute(sqlite_pool)
            .await
            .unwrap();
        let result = sqlx::query(insert)
            .bind("bob")
            .bind("h2")
            .execute(sqlite_pool)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.as_sqlite().unwrap();

        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, datetime('now', '+1 day'))",
        )
        .bind("session123")
        .bind(999i64)
        .execute(sqlite_pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_publisher_delete_cascades_to_books_only() {
        let pool = migrated_pool().await;
        let p = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO publishers (id, name) VALUES (1, 'Acme')")
            .execute(p)
            .await
            .unwrap();
        sqlx::query("INSERT INTO authors (id, first_name, last_name) VALUES (1, 'Ann', 'Lee')")
            .execute(p)
            .await
            .unwrap();
        sqlx::query("INSERT INTO books (id, title, publisher_id) VALUES (1, 'Rust', 1)")
            .execute(p)
            .await
            .unwrap();
        sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES (1, 1)")
            .execute(p)
            .await
            .unwrap();

        sqlx::query("DELETE FROM publishers WHERE id = 1")
            .execute(p)
            .await
            .unwrap();

        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(p)
            .await
            .unwrap();
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_authors")
            .fetch_one(p)
            .await
            .unwrap();
        let authors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(p)
            .await
            .unwrap();
        assert_eq!(books, 0);
        assert_eq!(links, 0);
        assert_eq!(authors, 1);
    }

    #[tokio::test]
    async fn test_book_defaults_to_available() {
        let pool = migrated_pool().await;
        let p = pool.as_sqlite().unwrap();

        sqlx::query("INSERT INTO publishers (id, name) VALUES (1, 'Acme')")
            .execute(p)
            .await
            .unwrap();
        sqlx::query("INSERT INTO books (title, publisher_id) VALUES ('Rust', 1)")
            .execute(p)
            .await
            .unwrap();

        let row = sqlx::query("SELECT available, publish_date FROM books")
            .fetch_one(p)
            .await
            .unwrap();
        let available: bool = row.get("available");
        let publish_date: Option<chrono::NaiveDate> = row.get("publish_date");
        assert!(available);
        assert!(publish_date.is_none());
    }

    #[test]
    fn test_get_migration() {
        assert_eq!(get_migration(1).map(|m| m.name), Some("create_users"));
        assert!(get_migration(999).is_none());
    }

    #[test]
    fn test_total_migrations() {
        assert_eq!(total_migrations(), 7);
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, i + 1);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);

        assert!(split_sql_statements("  ;  ; -- nothing").is_empty());
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }

    #[test]
    fn test_truncate_sql() {
        let long = "x".repeat(150);
        let truncated = truncate_sql(&long);
        assert_eq!(truncated.len(), 103);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
    }
}
