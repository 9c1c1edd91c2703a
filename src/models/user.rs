//! User model
//!
//! A registered account. Besides the login credentials it carries the profile
//! fields the REST API exposes (email, avatar) and the staff flag that opens
//! the library admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UploadedFile;

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address, may be blank
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Stored avatar path relative to the media root
    pub avatar: Option<String>,
    /// Whether the user may use the admin interface
    pub is_staff: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, is_staff: bool) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            avatar: None,
            is_staff,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<UploadedFile>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.avatar.is_none()
    }
}

/// Public profile shape returned by the users API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    /// Public URL of the avatar, or null
    pub avatar: Option<String>,
}

impl ProfileResponse {
    pub fn from_user(user: &User, media_url: &str) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            avatar: user
                .avatar
                .as_ref()
                .map(|path| format!("{}/{}", media_url.trim_end_matches('/'), path)),
        }
    }
}
