//! Media storage
//!
//! Uploaded images (avatars, gallery photos) are written below the configured
//! upload root under a random UUID file name and served back from `/uploads`.
//! A file is only accepted when both the declared content type and the leading
//! magic bytes identify one of the allowed image formats.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::models::UploadedFile;
use crate::services::validation::messages;

/// Public URL prefix for stored media
pub const MEDIA_URL: &str = "/uploads";

/// Errors raised while accepting an upload
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("The submitted file is empty.")]
    Empty,

    #[error("file exceeds the {0} byte limit")]
    TooLarge(u64),

    #[error("not an accepted image")]
    InvalidImage,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Form-facing message, or `None` for server-side failures
    pub fn field_message(&self) -> Option<String> {
        match self {
            StorageError::Empty => Some(messages::EMPTY_FILE.to_string()),
            StorageError::TooLarge(limit) => Some(messages::file_too_large(*limit)),
            StorageError::InvalidImage => Some(messages::INVALID_IMAGE.to_string()),
            StorageError::Io(_) => None,
        }
    }
}

/// Image kinds recognised by their leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Identify an image from its magic bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// Disk-backed storage for uploaded images
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
    config: UploadConfig,
}

impl MediaStorage {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            root: config.path.clone(),
            url_prefix: MEDIA_URL.to_string(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Public URL of a stored relative path
    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.url_prefix, relative)
    }

    /// Check that the upload is a non-empty, allowed image within the size limit
    pub fn validate(&self, file: &UploadedFile) -> Result<ImageKind, StorageError> {
        if file.data.is_empty() {
            return Err(StorageError::Empty);
        }
        if file.data.len() as u64 > self.config.max_file_size {
            return Err(StorageError::TooLarge(self.config.max_file_size));
        }

        let kind = ImageKind::sniff(&file.data).ok_or(StorageError::InvalidImage)?;
        if !self.config.is_type_allowed(kind.mime()) {
            return Err(StorageError::InvalidImage);
        }
        // A declared type, when present, must be an image type the config allows
        if let Some(declared) = file.content_type.as_deref() {
            let declared = declared.split(';').next().unwrap_or("").trim();
            if declared != "application/octet-stream" && !self.config.is_type_allowed(declared) {
                return Err(StorageError::InvalidImage);
            }
        }
        Ok(kind)
    }

    /// Validate and write the file to `subdir/<uuid>.<ext>`.
    ///
    /// Returns the path relative to the storage root.
    pub async fn save(&self, subdir: &str, file: &UploadedFile) -> Result<String, StorageError> {
        let kind = self.validate(file)?;

        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).await?;

        let name = format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.get_extension(kind.mime())
        );
        fs::write(dir.join(&name), &file.data).await?;

        let relative = format!("{}/{}", subdir, name);
        tracing::debug!(path = %relative, bytes = file.data.len(), "stored upload");
        Ok(relative)
    }

    /// Delete a stored file, logging instead of failing
    pub async fn remove(&self, relative: &str) {
        let path = self.root.join(relative);
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove stored file");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Smallest byte string that sniffs as a PNG
    pub(crate) const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    pub(crate) fn png_upload() -> UploadedFile {
        UploadedFile {
            filename: Some("pic.png".to_string()),
            content_type: Some("image/png".to_string()),
            data: PNG_BYTES.to_vec(),
        }
    }

    fn storage(dir: &TempDir) -> MediaStorage {
        MediaStorage::new(UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size: 64,
            ..UploadConfig::default()
        })
    }

    #[test]
    fn test_sniff() {
        assert_eq!(ImageKind::sniff(PNG_BYTES), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"GIF89a..."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"hello world"), None);
        assert_eq!(ImageKind::sniff(b""), None);
    }

    #[test]
    fn test_validate_rejections() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let empty = UploadedFile::default();
        assert!(matches!(storage.validate(&empty), Err(StorageError::Empty)));

        let big = UploadedFile {
            data: [PNG_BYTES, &[0u8; 100]].concat(),
            ..png_upload()
        };
        assert!(matches!(storage.validate(&big), Err(StorageError::TooLarge(64))));

        let text = UploadedFile {
            data: b"not an image".to_vec(),
            ..png_upload()
        };
        assert!(matches!(storage.validate(&text), Err(StorageError::InvalidImage)));

        let lying = UploadedFile {
            content_type: Some("text/plain".to_string()),
            ..png_upload()
        };
        assert!(matches!(storage.validate(&lying), Err(StorageError::InvalidImage)));

        assert_eq!(
            StorageError::InvalidImage.field_message().as_deref(),
            Some(messages::INVALID_IMAGE)
        );
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let relative = storage.save("avatars", &png_upload()).await.unwrap();
        assert!(relative.starts_with("avatars/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());
        assert_eq!(storage.url(&relative), format!("/uploads/{}", relative));

        storage.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());

        // removing twice only logs
        storage.remove(&relative).await;
    }

    #[tokio::test]
    async fn test_save_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let a = storage.save("images", &png_upload()).await.unwrap();
        let b = storage.save("images", &png_upload()).await.unwrap();
        assert_ne!(a, b);
    }
}
