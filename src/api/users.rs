//! User profile API endpoints
//!
//! - GET /api/users/profile/ - Current user's profile
//! - PATCH /api/users/update/ - Partial profile update (JSON or multipart)
//! - PATCH /api/users/update-password/ - Replace the password

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Serialize;

use super::common::{is_multipart, JsonObject, MultipartForm};
use super::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ProfileResponse, ProfileUpdate};
use crate::services::validation::{json_string, messages};
use crate::services::ValidationErrors;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/profile/", get(profile))
        .route("/users/update/", patch(update_profile))
        .route("/users/update-password/", patch(update_password))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A profile update body plus the errors found while decoding it
#[derive(Debug, Default)]
pub struct ProfilePatch {
    pub update: ProfileUpdate,
    pub errors: ValidationErrors,
}

impl ProfilePatch {
    fn from_json(body: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut errors = ValidationErrors::new();
        let update = ProfileUpdate {
            username: errors.check("username", json_string(body, "username")).flatten(),
            email: errors.check("email", json_string(body, "email")).flatten(),
            avatar: None,
        };
        if body.contains_key("avatar") {
            errors.add("avatar", messages::NOT_A_FILE);
        }
        Self { update, errors }
    }

    fn from_multipart(form: MultipartForm) -> Self {
        let mut errors = ValidationErrors::new();

        for field in ["username", "email"] {
            if form.file(field).is_some() {
                errors.add(field, messages::NOT_A_STRING);
            }
        }
        if form.fields.get("avatar").is_some() {
            errors.add("avatar", messages::NOT_A_FILE);
        }

        let update = ProfileUpdate {
            username: form.fields.get("username").map(str::to_string),
            email: form.fields.get("email").map(str::to_string),
            avatar: form.file("avatar").cloned(),
        };
        Self { update, errors }
    }
}

impl<S> FromRequest<S> for ProfilePatch
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let JsonObject(body) = JsonObject::from_request(req, state).await?;
            return Ok(Self::from_json(&body));
        }

        let unreadable = |error: &dyn std::fmt::Display| {
            tracing::warn!(error = %error, "unreadable profile upload");
            Self {
                update: ProfileUpdate::default(),
                errors: ValidationErrors::single("avatar", messages::NOT_A_FILE),
            }
        };

        let multipart = match Multipart::from_request(req, state).await {
            Ok(multipart) => multipart,
            Err(rejection) => return Ok(unreadable(&rejection.body_text())),
        };
        match MultipartForm::read(multipart).await {
            Ok(form) => Ok(Self::from_multipart(form)),
            Err(e) => Ok(unreadable(&e)),
        }
    }
}

/// GET /api/users/profile/
async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<ProfileResponse> {
    Json(state.user_service.profile(&user))
}

/// PATCH /api/users/update/
async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    patch: ProfilePatch,
) -> Result<Json<ProfileResponse>, ApiError> {
    let ProfilePatch { update, mut errors } = patch;
    errors.merge(state.user_service.check_profile(&user, &update).await?);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let updated = state.user_service.update_profile(user.id, update).await?;
    Ok(Json(state.user_service.profile(&updated)))
}

/// PATCH /api/users/update-password/
async fn update_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonObject(body): JsonObject,
) -> Result<Json<MessageResponse>, ApiError> {
    let password = json_string(&body, "password")
        .map_err(|message| ValidationErrors::single("password", message))?
        .ok_or_else(|| ValidationErrors::single("password", messages::REQUIRED))?;

    state.user_service.update_password(user.id, &password).await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::tests::png_upload;
    use serde_json::json;

    #[test]
    fn test_json_patch_reads_present_fields_only() {
        let body = json!({"email": "new@example.com"});
        let patch = ProfilePatch::from_json(body.as_object().unwrap());
        assert!(patch.errors.is_empty());
        assert!(patch.update.username.is_none());
        assert_eq!(patch.update.email.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn test_json_patch_rejects_wrong_types() {
        let body = json!({"username": null, "email": ["a"], "avatar": "x.png"});
        let patch = ProfilePatch::from_json(body.as_object().unwrap());
        assert_eq!(patch.errors.get("username").unwrap(), [messages::NULL]);
        assert_eq!(patch.errors.get("email").unwrap(), [messages::NOT_A_STRING]);
        assert_eq!(patch.errors.get("avatar").unwrap(), [messages::NOT_A_FILE]);
        assert!(patch.update.is_empty());
    }

    #[test]
    fn test_multipart_patch_splits_fields_and_files() {
        let form = MultipartForm {
            fields: super::super::common::FormData::from_pairs(vec![(
                "username".into(),
                "ana".into(),
            )]),
            files: vec![("avatar".into(), png_upload())],
        };
        let patch = ProfilePatch::from_multipart(form);
        assert!(patch.errors.is_empty());
        assert_eq!(patch.update.username.as_deref(), Some("ana"));
        assert!(patch.update.avatar.is_some());
    }

    #[test]
    fn test_multipart_text_avatar_is_not_a_file() {
        let form = MultipartForm {
            fields: super::super::common::FormData::from_pairs(vec![(
                "avatar".into(),
                "me.png".into(),
            )]),
            files: Vec::new(),
        };
        let patch = ProfilePatch::from_multipart(form);
        assert_eq!(patch.errors.get("avatar").unwrap(), [messages::NOT_A_FILE]);
    }
}
