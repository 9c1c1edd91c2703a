//! User service
//!
//! Account and session management shared by the HTML login pages and the
//! JSON auth API:
//! - Registration (the first account becomes staff)
//! - Login/logout with random session tokens
//! - Session validation, dropping expired sessions
//! - Profile partial update with avatar upload
//! - Password replacement

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, ProfileResponse, ProfileUpdate, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::storage::{MediaStorage, StorageError};
use crate::services::validation::{self, messages, ValidationErrors};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Storage subdirectory for avatars
const AVATAR_DIR: &str = "avatars";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// One or more fields failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The user no longer exists
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for UserServiceError {
    fn from(errors: ValidationErrors) -> Self {
        UserServiceError::Validation(errors)
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    storage: MediaStorage,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories and media storage
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        storage: MediaStorage,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            storage,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Override the session lifetime
    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days;
        self
    }

    pub fn session_expiration_days(&self) -> i64 {
        self.session_expiration_days
    }

    /// Register a new user.
    ///
    /// The first account created becomes staff so the admin is reachable on
    /// a fresh install.
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let mut errors = ValidationErrors::new();

        let username = errors.check(
            "username",
            validation::username(&input.username, messages::REQUIRED),
        );
        let email = errors.check("email", validation::optional_email(&input.email));
        if input.password.trim().is_empty() {
            errors.add("password", messages::REQUIRED);
        }

        if let Some(name) = username.as_deref() {
            if self
                .user_repo
                .username_taken(name, None)
                .await
                .context("Failed to check username")?
            {
                errors.add("username", messages::USERNAME_TAKEN);
            }
        }

        let (username, email) = match (username, email) {
            (Some(u), Some(e)) if errors.is_empty() => (u, e),
            _ => return Err(errors.into()),
        };

        let is_staff = self.is_first_user().await?;
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = self
            .user_repo
            .create(&User::new(username, email, password_hash, is_staff))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, is_staff, "user registered");
        Ok(user)
    }

    /// Check credentials and open a new session
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, Session), UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(username.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "login rejected");
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens give `None`; an expired session is deleted
    /// on the way out.
    pub async fn validate_session(&self, session_id: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(session_id).await {
                tracing::warn!(error = %e, "failed to delete expired session");
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// Whether no account exists yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Remove every expired session, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        if removed > 0 {
            tracing::info!(removed, "expired sessions cleaned up");
        }
        Ok(removed)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.user_repo.get_by_id(id).await.context("Failed to get user")?)
    }

    /// Public profile of a user
    pub fn profile(&self, user: &User) -> ProfileResponse {
        ProfileResponse::from_user(user, self.storage.url_prefix())
    }

    /// Validate a partial profile update without writing anything
    pub async fn check_profile(
        &self,
        user: &User,
        update: &ProfileUpdate,
    ) -> Result<ValidationErrors, UserServiceError> {
        let mut errors = ValidationErrors::new();

        if let Some(raw) = update.username.as_deref() {
            if let Some(name) = errors.check("username", validation::username(raw, messages::BLANK)) {
                if self
                    .user_repo
                    .username_taken(&name, Some(user.id))
                    .await
                    .context("Failed to check username")?
                {
                    errors.add("username", messages::USERNAME_TAKEN);
                }
            }
        }

        if let Some(raw) = update.email.as_deref() {
            errors.check("email", validation::optional_email(raw));
        }

        if let Some(file) = update.avatar.as_ref() {
            if let Err(e) = self.storage.validate(file) {
                match e.field_message() {
                    Some(message) => errors.add("avatar", message),
                    None => return Err(anyhow::Error::new(e).into()),
                }
            }
        }

        Ok(errors)
    }

    /// Apply a partial profile update.
    ///
    /// Every field is validated before anything is written. Absent fields
    /// keep their stored value. A newly stored avatar is removed again when
    /// the row update fails.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<User, UserServiceError> {
        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)?;

        let errors = self.check_profile(&user, &update).await?;
        if !errors.is_empty() {
            return Err(errors.into());
        }

        if let Some(raw) = update.username.as_deref() {
            user.username = raw.trim().to_string();
        }
        if let Some(raw) = update.email.as_deref() {
            user.email = raw.trim().to_string();
        }

        let stored_avatar = match update.avatar.as_ref() {
            Some(file) => {
                let path = self
                    .storage
                    .save(AVATAR_DIR, file)
                    .await
                    .map_err(storage_failure)?;
                user.avatar = Some(path.clone());
                Some(path)
            }
            None => None,
        };

        user.updated_at = Utc::now();
        match self.user_repo.update_profile(&user).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                if let Some(path) = stored_avatar {
                    self.storage.remove(&path).await;
                }
                Err(UserServiceError::Internal(e.context("Failed to update profile")))
            }
        }
    }

    /// Replace the password hash. Existing sessions stay valid.
    ///
    /// Surrounding whitespace is trimmed before hashing.
    pub async fn update_password(&self, user_id: i64, password: &str) -> Result<(), UserServiceError> {
        let password = password.trim();
        if password.is_empty() {
            return Err(ValidationErrors::single("password", messages::BLANK).into());
        }

        let hash = hash_password(password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user_id, &hash)
            .await
            .context("Failed to update password")?;

        tracing::info!(user_id, "password updated");
        Ok(())
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, Duration::days(self.session_expiration_days));
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }
}

fn storage_failure(e: StorageError) -> UserServiceError {
    match e.field_message() {
        Some(message) => ValidationErrors::single("avatar", message).into(),
        None => UserServiceError::Internal(anyhow::Error::new(e).context("Failed to store avatar")),
    }
}
