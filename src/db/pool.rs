//! Database connection pool abstraction
//!
//! This module provides a unified interface for database operations that works
//! with both SQLite and MySQL backends. The appropriate pool is created based
//! on the configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions, MySqlQueryResult},
    sqlite::{SqlitePool, SqlitePoolOptions, SqliteQueryResult},
};
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Database pool trait that abstracts over different database backends.
///
/// Repositories never hold a concrete pool; they ask the trait object for the
/// driver and borrow the matching sqlx pool through [`with_pool!`].
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL query that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Check if the database connection is healthy
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool
    async fn close(&self);

    /// Get the database driver type
    fn driver(&self) -> DatabaseDriver;

    /// Get the underlying SQLite pool if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool>;

    /// Get the underlying MySQL pool if this is a MySQL connection
    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Run `$body` with `$p` bound to the concrete sqlx pool behind a
/// [`DynDatabasePool`].
///
/// The body is expanded once per driver, so the same query-building code
/// type-checks against both `SqlitePool` and `MySqlPool`. Must be used inside
/// a function returning `anyhow::Result`.
///
/// The `|p, DB|` form also aliases the sqlx database type, for queries whose
/// binds are added in a loop.
macro_rules! with_pool {
    ($pool:expr, |$p:ident, $db:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                #[allow(clippy::upper_case_acronyms)]
                type $db = ::sqlx::Sqlite;
                let $p = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool is not available"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                #[allow(clippy::upper_case_acronyms)]
                type $db = ::sqlx::MySql;
                let $p = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool is not available"))?;
                $body
            }
        }
    };
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $p = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool is not available"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $p = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool is not available"))?;
                $body
            }
        }
    };
}
pub(crate) use with_pool;

/// Uniform access to the id generated by an `INSERT`.
pub trait LastInsertId {
    fn last_id(&self) -> i64;
}

impl LastInsertId for SqliteQueryResult {
    fn last_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl LastInsertId for MySqlQueryResult {
    fn last_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:")
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Create a new SQLite connection pool
    pub async fn new(url: &str) -> Result<Self> {
        let in_memory = is_memory_url(url);

        if !in_memory {
            let path = url.strip_prefix("sqlite:").unwrap_or(url);
            let path = path.split('?').next().unwrap_or(path);

            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {:?}", parent)
                    })?;
                }
            }
        }

        let connection_url = if url.starts_with("sqlite:") {
            if url.contains('?') {
                url.to_string()
            } else if in_memory {
                url.to_string()
            } else {
                format!("{}?mode=rwc", url)
            }
        } else if url == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", url)
        };

        // Every in-memory connection is its own database, so the pool must
        // keep exactly one connection alive for its whole lifetime.
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(20)
        };

        // sqlx turns foreign_keys on for every connection it opens
        let pool = options
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    /// Create a new MySQL connection pool
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(30)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
///
/// # Example
///
/// ```ignore
/// use workbench::config::DatabaseConfig;
/// use workbench::db::create_pool;
///
/// let config = DatabaseConfig::default();
/// let pool = create_pool(&config).await?;
/// pool.ping().await?;
/// ```
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => {
            let db = SqliteDatabase::new(&config.url).await?;
            Ok(Arc::new(db))
        }
        DatabaseDriver::Mysql => {
            let db = MysqlDatabase::new(&config.url).await?;
            Ok(Arc::new(db))
        }
    }
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_tables_between_queries() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");

        let affected = pool
            .execute("INSERT INTO test (name) VALUES ('test')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);

        let affected = pool
            .execute("UPDATE test SET name = 'renamed'")
            .await
            .expect("Table should still exist");
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = create_test_pool().await.unwrap();
        pool.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        pool.execute(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))",
        )
        .await
        .unwrap();

        let result = pool
            .execute("INSERT INTO child (parent_id) VALUES (42)")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_with_pool_dispatches_to_sqlite() {
        async fn insert_and_count(pool: &DynDatabasePool) -> Result<(i64, i64)> {
            pool.execute("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT)")
                .await?;
            with_pool!(pool, |p| {
                let result = sqlx::query("INSERT INTO items (label) VALUES (?)")
                    .bind("first")
                    .execute(p)
                    .await?;
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
                    .fetch_one(p)
                    .await?;
                Ok((result.last_id(), count))
            })
        }

        let pool = create_test_pool().await.unwrap();
        let (id, count) = insert_and_count(&pool).await.unwrap();
        assert_eq!(id, 1);
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_sqlite_nested_directory_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("test.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        assert!(db_path.exists());
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_creation() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let config = DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(pool.as_mysql().is_some());
        pool.ping().await.expect("Ping should succeed");
    }
}
