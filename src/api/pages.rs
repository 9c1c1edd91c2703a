//! Template-rendered demo pages

use axum::{extract::State, response::Html, routing::get, Router};

use super::common::{page_context, render};
use super::middleware::{AppState, CurrentUser, HtmlError};

const FRUITS: [&str; 5] = ["Apple", "Banana", "Cherry", "Mango", "Orange"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app1/", get(profile_card))
        .route("/app3/", get(fruit_list))
}

/// GET /app1/
async fn profile_card(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user.as_ref());
    context.insert("username", "Alice");
    context.insert("age", &25);
    render(&state, "app1/index.html", &context)
}

/// GET /app3/
async fn fruit_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user.as_ref());
    context.insert("fruits", &FRUITS);
    render(&state, "app3/index.html", &context)
}
