//! Database layer
//!
//! Supports SQLite (default, single-file deployment) and MySQL. The driver is
//! selected by configuration and hidden behind the `DatabasePool` trait, so
//! services and repositories only ever see a `DynDatabasePool`.
//!
//! # Usage
//!
//! ```ignore
//! use workbench::config::DatabaseConfig;
//! use workbench::db::{create_pool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, LastInsertId, MysqlDatabase,
    SqliteDatabase,
};
