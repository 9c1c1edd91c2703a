//! API middleware
//!
//! Contains:
//! - Shared application state
//! - Authentication (session token from bearer header or cookie)
//! - Authorization (login required, staff only)
//! - JSON and HTML error responses

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{Config, SessionConfig, UploadConfig};
use crate::db::repositories::{
    SqlxAuthorRepository, SqlxBookRepository, SqlxPhotoRepository, SqlxPublisherRepository,
    SqlxSessionRepository, SqlxTodoRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    FeedbackStore, LibraryService, LibraryServiceError, MediaStorage, PhotoService,
    PhotoServiceError, TodoService, TodoServiceError, UserService, UserServiceError,
    ValidationErrors,
};
use crate::templates::{simple_error_page, TemplateEngine, TemplateError};

// ============================================================================
// Application State
// ============================================================================

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub todo_service: Arc<TodoService>,
    pub library_service: Arc<LibraryService>,
    pub photo_service: Arc<PhotoService>,
    pub feedback: Arc<FeedbackStore>,
    pub templates: Arc<TemplateEngine>,
    pub upload_config: Arc<UploadConfig>,
    pub session_config: Arc<SessionConfig>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool
    pub fn new(pool: DynDatabasePool, config: &Config, templates: TemplateEngine) -> Self {
        let storage = MediaStorage::new(config.upload.clone());

        let user_service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            storage.clone(),
        )
        .with_session_expiration(config.session.expiration_days);

        let library_service = LibraryService::new(
            SqlxPublisherRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool.clone()),
            SqlxBookRepository::boxed(pool.clone()),
        );

        Self {
            user_service: Arc::new(user_service),
            todo_service: Arc::new(TodoService::new(SqlxTodoRepository::boxed(pool.clone()))),
            library_service: Arc::new(library_service),
            photo_service: Arc::new(PhotoService::new(
                SqlxPhotoRepository::boxed(pool.clone()),
                storage,
            )),
            feedback: Arc::new(FeedbackStore::new()),
            templates: Arc::new(templates),
            upload_config: Arc::new(config.upload.clone()),
            session_config: Arc::new(config.session.clone()),
            pool,
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))
    }
}

/// The logged-in user if there is one, for pages open to everybody
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

/// Extract session token from the bearer header, then the session cookie
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=') {
                    if name == cookie_name && !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    None
}

/// `Set-Cookie` value carrying a new session token
pub fn session_cookie(config: &SessionConfig, token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        token,
        config.expiration_days * 24 * 60 * 60
    )
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie(config: &SessionConfig) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    )
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, UserServiceError> {
    match extract_session_token(headers, &state.session_config.cookie_name) {
        Some(token) => state.user_service.validate_session(&token).await,
        None => Ok(None),
    }
}

/// Authentication middleware for the JSON API
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, request.headers())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Attach the user to the request when a valid session is presented
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, request.headers()).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "session lookup failed"),
    }
    next.run(request).await
}

/// Send anonymous visitors of HTML pages to the login form.
///
/// Runs after [`optional_auth`].
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Redirect::to(&format!(
        "/accounts/login/?next={}",
        urlencoding::encode(target)
    ))
    .into_response()
}

/// Staff-only HTML pages. Runs after [`require_login`].
pub async fn require_staff(request: Request, next: Next) -> Result<Response, HtmlError> {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(user) if user.0.is_staff => Ok(next.run(request).await),
        _ => Err(HtmlError::Forbidden),
    }
}

// ============================================================================
// JSON errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
    /// Field errors, sent as the bare body instead of `error`
    #[serde(skip)]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            fields: None,
        }
    }

    /// 400 with a `{field: [messages]}` body
    pub fn fields(errors: ValidationErrors) -> Self {
        let mut error = Self::new("VALIDATION_ERROR", "Invalid input");
        error.fields = Some(errors);
        error
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Log the cause and answer with an opaque 500
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "request failed");
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(fields) = self.fields {
            return (StatusCode::BAD_REQUEST, Json(fields)).into_response();
        }

        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::fields(errors)
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(message) => ApiError::unauthorized(message),
            UserServiceError::Validation(errors) => ApiError::fields(errors),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

impl From<TodoServiceError> for ApiError {
    fn from(err: TodoServiceError) -> Self {
        match err {
            TodoServiceError::Validation(errors) => ApiError::fields(errors),
            TodoServiceError::NotFound => ApiError::not_found("Not found."),
            TodoServiceError::Internal(e) => ApiError::internal(e),
        }
    }
}

// ============================================================================
// HTML errors
// ============================================================================

/// Marker left on a response whose body should be the rendered error page
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

/// Failure of an HTML handler
#[derive(Debug)]
pub enum HtmlError {
    NotFound,
    Forbidden,
    Internal(anyhow::Error),
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HtmlError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            HtmlError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            HtmlError::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
            }
        };

        let mut response = (
            status,
            Html(simple_error_page(status.as_u16(), message)),
        )
            .into_response();
        response.extensions_mut().insert(ErrorPage {
            status,
            message: message.to_string(),
        });
        response
    }
}

impl From<anyhow::Error> for HtmlError {
    fn from(err: anyhow::Error) -> Self {
        HtmlError::Internal(err)
    }
}

impl From<TemplateError> for HtmlError {
    fn from(err: TemplateError) -> Self {
        HtmlError::Internal(err.into())
    }
}

impl From<UserServiceError> for HtmlError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound => HtmlError::NotFound,
            UserServiceError::Internal(e) => HtmlError::Internal(e),
            other => HtmlError::Internal(anyhow::anyhow!("unhandled user error: {}", other)),
        }
    }
}

impl From<TodoServiceError> for HtmlError {
    fn from(err: TodoServiceError) -> Self {
        match err {
            TodoServiceError::NotFound => HtmlError::NotFound,
            TodoServiceError::Internal(e) => HtmlError::Internal(e),
            other => HtmlError::Internal(anyhow::anyhow!("unhandled todo error: {}", other)),
        }
    }
}

impl From<LibraryServiceError> for HtmlError {
    fn from(err: LibraryServiceError) -> Self {
        match err {
            LibraryServiceError::NotFound => HtmlError::NotFound,
            LibraryServiceError::Internal(e) => HtmlError::Internal(e),
            other => HtmlError::Internal(anyhow::anyhow!("unhandled library error: {}", other)),
        }
    }
}

impl From<PhotoServiceError> for HtmlError {
    fn from(err: PhotoServiceError) -> Self {
        match err {
            PhotoServiceError::Internal(e) => HtmlError::Internal(e),
            other => HtmlError::Internal(anyhow::anyhow!("unhandled photo error: {}", other)),
        }
    }
}

/// Replace the body of HTML error responses with the rendered `error.html`
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(page) = response.extensions_mut().remove::<ErrorPage>() else {
        return response;
    };

    let mut context = tera::Context::new();
    context.insert("status", &page.status.as_u16());
    context.insert("message", &page.message);
    let body = match state.templates.render("error.html", &context) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(error = %e, "error page failed to render");
            simple_error_page(page.status.as_u16(), &page.message)
        }
    };
    (page.status, Html(body)).into_response()
}
