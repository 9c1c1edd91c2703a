//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login session, addressed by its random token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` with a fresh UUID v4 token
    pub fn start(user_id: i64, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + lifetime,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
