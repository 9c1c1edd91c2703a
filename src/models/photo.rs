//! Gallery photo model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded gallery image
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Photo {
    pub id: i64,
    /// Optional caption, may be blank
    pub title: String,
    /// Stored path relative to the media root
    pub image: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Photo {
    /// Public URL of the stored image
    pub fn url(&self, media_url: &str) -> String {
        format!("{}/{}", media_url.trim_end_matches('/'), self.image)
    }
}
