//! Authentication API endpoints
//!
//! - POST /api/auth/register/ - Register a new user
//! - POST /api/auth/login/ - Login with username and password
//! - POST /api/auth/logout/ - Logout (requires auth)

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::common::JsonObject;
use super::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, ApiError, AppState,
};
use crate::models::{CreateUserInput, Session, User};
use crate::services::validation::{json_string, messages};
use crate::services::ValidationErrors;

/// Public auth routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register/", post(register))
        .route("/auth/login/", post(login))
}

/// Auth routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/logout/", post(logout))
}

/// Response for successful login or registration
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Read required string fields, collecting type and presence errors
fn required_strings(
    body: &Map<String, Value>,
    fields: &[&str],
) -> Result<Vec<String>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut values = Vec::with_capacity(fields.len());

    for field in fields {
        match errors.check(field, json_string(body, field)) {
            Some(Some(value)) => values.push(value),
            Some(None) => {
                errors.add(field, messages::REQUIRED);
                values.push(String::new());
            }
            None => values.push(String::new()),
        }
    }

    errors.into_result(values)
}

fn with_session(state: &AppState, status: StatusCode, user: User, session: Session) -> Response {
    let cookie = session_cookie(&state.session_config, &session.id);
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    )
        .into_response()
}

/// POST /api/auth/register/
async fn register(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Response, ApiError> {
    let mut errors = ValidationErrors::new();
    let credentials = required_strings(&body, &["username", "password"]);
    let email = errors.check("email", json_string(&body, "email")).flatten();

    let (username, password) = match credentials {
        Ok(values) if errors.is_empty() => (values[0].clone(), values[1].clone()),
        Ok(_) => return Err(errors.into()),
        Err(field_errors) => {
            errors.merge(field_errors);
            return Err(errors.into());
        }
    };

    let user = state
        .user_service
        .register(CreateUserInput {
            username,
            email: email.unwrap_or_default(),
            password: password.clone(),
        })
        .await?;
    let (user, session) = state.user_service.login(&user.username, &password).await?;

    Ok(with_session(&state, StatusCode::CREATED, user, session))
}

/// POST /api/auth/login/
async fn login(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Response, ApiError> {
    let values = required_strings(&body, &["username", "password"])?;
    let (user, session) = state.user_service.login(&values[0], &values[1]).await?;

    tracing::info!(user_id = user.id, "API login");
    Ok(with_session(&state, StatusCode::OK, user, session))
}

/// POST /api/auth/logout/
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_token(&headers, &state.session_config.cookie_name) {
        state.user_service.logout(&token).await?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(&state.session_config))],
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_strings() {
        let body = object(json!({"username": "ana", "password": "pw"}));
        assert_eq!(
            required_strings(&body, &["username", "password"]).unwrap(),
            vec!["ana", "pw"]
        );
    }

    #[test]
    fn test_required_strings_reports_each_field() {
        let body = object(json!({"username": null}));
        let errors = required_strings(&body, &["username", "password"]).unwrap_err();
        assert_eq!(errors.get("username").unwrap(), [messages::NULL]);
        assert_eq!(errors.get("password").unwrap(), [messages::REQUIRED]);
    }
}
