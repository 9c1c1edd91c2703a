//! Photo gallery service

use crate::db::repositories::PhotoRepository;
use crate::models::{Photo, UploadedFile};
use crate::services::storage::MediaStorage;
use crate::services::validation::{self, messages, ValidationErrors};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

/// Storage subdirectory for gallery images
const PHOTO_DIR: &str = "photos";

#[derive(Debug, thiserror::Error)]
pub enum PhotoServiceError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for PhotoServiceError {
    fn from(errors: ValidationErrors) -> Self {
        PhotoServiceError::Validation(errors)
    }
}

/// A photo with its public URL, as the gallery template shows it
#[derive(Debug, Clone, Serialize)]
pub struct PhotoView {
    #[serde(flatten)]
    pub photo: Photo,
    pub url: String,
}

pub struct PhotoService {
    repo: Arc<dyn PhotoRepository>,
    storage: MediaStorage,
}

impl PhotoService {
    pub fn new(repo: Arc<dyn PhotoRepository>, storage: MediaStorage) -> Self {
        Self { repo, storage }
    }

    /// Gallery contents, newest first
    pub async fn gallery(&self) -> Result<Vec<PhotoView>, PhotoServiceError> {
        let photos = self
            .repo
            .list_newest_first()
            .await
            .context("Failed to list photos")?;
        Ok(photos
            .into_iter()
            .map(|photo| PhotoView {
                url: photo.url(self.storage.url_prefix()),
                photo,
            })
            .collect())
    }

    /// Validate and store an upload, then record it.
    ///
    /// `image` is `None` when the form carried no file part.
    pub async fn upload(
        &self,
        title: &str,
        image: Option<&UploadedFile>,
    ) -> Result<Photo, PhotoServiceError> {
        let mut errors = ValidationErrors::new();
        let title = errors.check("title", validation::text(title, 100, None));

        match image {
            None => errors.add("image", messages::REQUIRED),
            Some(file) => {
                if let Err(e) = self.storage.validate(file) {
                    match e.field_message() {
                        Some(message) => errors.add("image", message),
                        None => return Err(anyhow::Error::new(e).into()),
                    }
                }
            }
        }

        let (title, file) = match (title, image) {
            (Some(title), Some(file)) if errors.is_empty() => (title, file),
            _ => return Err(errors.into()),
        };

        let path = self
            .storage
            .save(PHOTO_DIR, file)
            .await
            .map_err(|e| match e.field_message() {
                Some(message) => ValidationErrors::single("image", message).into(),
                None => PhotoServiceError::Internal(
                    anyhow::Error::new(e).context("Failed to store photo"),
                ),
            })?;

        match self.repo.create(&title, &path).await {
            Ok(photo) => {
                tracing::info!(photo_id = photo.id, path = %path, "photo uploaded");
                Ok(photo)
            }
            Err(e) => {
                self.storage.remove(&path).await;
                Err(PhotoServiceError::Internal(e.context("Failed to record photo")))
            }
        }
    }
}
