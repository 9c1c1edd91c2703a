//! API layer - HTTP handlers and routing
//!
//! One axum router serves every workshop:
//! - Greetings and template pages
//! - Feedback form and list
//! - Session login, logout and registration
//! - To-do list (login required)
//! - Photo gallery
//! - Library admin (staff only)
//! - JSON API for auth, user profile and tasks
//! - Uploaded media under `/uploads`

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod common;
pub mod feedback;
pub mod gallery;
pub mod greetings;
pub mod middleware;
pub mod pages;
pub mod tasks;
pub mod todos;
pub mod users;


use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, Method},
    middleware as axum_middleware,
    response::{IntoResponse, Redirect, Response},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser, CurrentUser, HtmlError};

use crate::services::MEDIA_URL;

/// Room for multipart framing and text fields around the largest file
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Build the JSON API router (mounted under `/api`)
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(users::router())
        .merge(tasks::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(auth::public_router())
        .merge(protected_routes)
}

/// Build the HTML page router
pub fn build_html_router(state: AppState) -> Router<AppState> {
    let admin_routes = admin::router()
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    let login_routes = todos::router()
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    Router::new()
        .merge(greetings::router())
        .merge(pages::router())
        .merge(feedback::router())
        .merge(accounts::router())
        .merge(gallery::router())
        .merge(login_routes)
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_OVERHEAD);

    Router::new()
        .nest("/api", build_api_router(state.clone()).layer(cors))
        .merge(build_html_router(state.clone()))
        .nest_service(MEDIA_URL, ServeDir::new(&state.upload_config.path))
        .fallback(append_slash)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unknown path: retry GETs with a trailing slash, otherwise 404
async fn append_slash(request: Request) -> Response {
    let uri = request.uri();
    let is_read = request.method() == Method::GET || request.method() == Method::HEAD;

    if is_read && !uri.path().ends_with('/') {
        let target = match uri.query() {
            Some(query) => format!("{}/?{}", uri.path(), query),
            None => format!("{}/", uri.path()),
        };
        return Redirect::permanent(&target).into_response();
    }

    HtmlError::NotFound.into_response()
}
