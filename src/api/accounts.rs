//! Session login, logout and registration pages

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::common::{insert_form, page_context, render, safe_next, FormData};
use super::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, AppState, CurrentUser, HtmlError,
};
use crate::models::{CreateUserInput, Session};
use crate::services::{UserServiceError, ValidationErrors};

/// Where a login lands without a `next` parameter
pub const LOGIN_REDIRECT: &str = "/todos/";

const LOGIN_FAILED: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts/login/", get(login_page).post(login))
        .route("/accounts/logout/", post(logout))
        .route("/accounts/register/", get(register_page).post(register))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct LoginForm {
    username: String,
}

#[derive(Debug, Default, Serialize)]
struct RegisterForm {
    username: String,
    email: String,
}

fn login_form(
    state: &AppState,
    user: Option<&crate::models::User>,
    username: &str,
    next: &str,
    error: Option<&str>,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user);
    context.insert(
        "form",
        &LoginForm {
            username: username.to_string(),
        },
    );
    context.insert("next", next);
    if let Some(error) = error {
        context.insert("error", error);
    }
    render(state, "accounts/login.html", &context)
}

/// Redirect carrying a fresh session cookie
fn start_session(state: &AppState, session: &Session, location: &str) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(&state.session_config, &session.id))],
        Redirect::to(location),
    )
        .into_response()
}

/// GET /accounts/login/
async fn login_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, HtmlError> {
    login_form(&state, user.as_ref(), "", query.next.as_deref().unwrap_or(""), None)
}

/// POST /accounts/login/
async fn login(State(state): State<AppState>, form: FormData) -> Result<Response, HtmlError> {
    let username = form.value("username");
    let next = form.value("next");

    match state
        .user_service
        .login(&username, &form.value("password"))
        .await
    {
        Ok((user, session)) => {
            tracing::info!(user_id = user.id, "logged in");
            let target = safe_next(Some(&next), LOGIN_REDIRECT);
            Ok(start_session(&state, &session, target))
        }
        Err(UserServiceError::AuthenticationError(_)) => {
            Ok(login_form(&state, None, &username, &next, Some(LOGIN_FAILED))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /accounts/logout/
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, HtmlError> {
    if let Some(token) = extract_session_token(&headers, &state.session_config.cookie_name) {
        state.user_service.logout(&token).await?;
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&state.session_config))],
        Redirect::to("/"),
    )
        .into_response())
}

fn register_form(
    state: &AppState,
    user: Option<&crate::models::User>,
    form: &RegisterForm,
    errors: &ValidationErrors,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user);
    insert_form(&mut context, form, errors);
    render(state, "accounts/register.html", &context)
}

/// GET /accounts/register/
async fn register_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    register_form(&state, user.as_ref(), &RegisterForm::default(), &ValidationErrors::new())
}

/// POST /accounts/register/
async fn register(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    form: FormData,
) -> Result<Response, HtmlError> {
    let input = CreateUserInput {
        username: form.value("username"),
        email: form.value("email"),
        password: form.value("password"),
    };

    let user = match state.user_service.register(input.clone()).await {
        Ok(user) => user,
        Err(UserServiceError::Validation(errors)) => {
            let raw = RegisterForm {
                username: input.username,
                email: input.email,
            };
            return Ok(register_form(&state, current.as_ref(), &raw, &errors)?.into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let (_, session) = state
        .user_service
        .login(&user.username, &input.password)
        .await?;
    Ok(start_session(&state, &session, LOGIN_REDIRECT))
}
