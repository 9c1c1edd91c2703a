//! Photo repository

use crate::db::pool::{with_pool, LastInsertId};
use crate::db::DynDatabasePool;
use crate::models::Photo;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Photo repository trait
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// All photos, newest first
    async fn list_newest_first(&self) -> Result<Vec<Photo>>;

    /// Record an already stored image
    async fn create(&self, title: &str, image: &str) -> Result<Photo>;
}

/// SQLx-based photo repository
pub struct SqlxPhotoRepository {
    pool: DynDatabasePool,
}

impl SqlxPhotoRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PhotoRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PhotoRepository for SqlxPhotoRepository {
    async fn list_newest_first(&self) -> Result<Vec<Photo>> {
        // id breaks ties between uploads within the same timestamp
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Photo>(
                "SELECT id, title, image, uploaded_at FROM photos ORDER BY uploaded_at DESC, id DESC",
            )
            .fetch_all(p)
            .await
            .context("Failed to list photos")
        })
    }

    async fn create(&self, title: &str, image: &str) -> Result<Photo> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query("INSERT INTO photos (title, image, uploaded_at) VALUES (?, ?, ?)")
                .bind(title)
                .bind(image)
                .bind(now)
                .execute(p)
                .await
                .context("Failed to create photo")?
                .last_id()
        });

        Ok(Photo {
            id,
            title: title.to_string(),
            image: image.to_string(),
            uploaded_at: now,
        })
    }
}
