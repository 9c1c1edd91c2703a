//! Feedback form and list

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};

use super::common::{insert_form, page_context, render};
use super::middleware::{AppState, CurrentUser, HtmlError};
use crate::models::FeedbackForm;
use crate::services::ValidationErrors;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feedback/", get(show_form).post(submit))
        .route("/feedback/list/", get(list))
}

/// GET /feedback/
async fn show_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user.as_ref());
    insert_form(&mut context, &FeedbackForm::default(), &ValidationErrors::new());
    render(&state, "feedback/form.html", &context)
}

/// POST /feedback/
async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, HtmlError> {
    match state.feedback.submit(&form).await {
        Ok(_) => Ok(Redirect::to("/feedback/list/").into_response()),
        Err(errors) => {
            let mut context = page_context(user.as_ref());
            insert_form(&mut context, &form, &errors);
            Ok(render(&state, "feedback/form.html", &context)?.into_response())
        }
    }
}

/// GET /feedback/list/
async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user.as_ref());
    context.insert("feedbacks", &state.feedback.list().await);
    render(&state, "feedback/feedbacks.html", &context)
}
