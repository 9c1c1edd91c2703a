//! The logged-in user's to-do list

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use super::common::{insert_form, page_context, render, FormData};
use super::middleware::{AppState, AuthenticatedUser, HtmlError};
use crate::services::{todo, TodoServiceError, ValidationErrors};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/todos/", get(list))
        .route("/todos/add/", get(add_page).post(add))
}

#[derive(Debug, Default, Serialize)]
struct TaskForm {
    name: String,
    state: bool,
}

/// GET /todos/
async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Html<String>, HtmlError> {
    let todos = state.todo_service.list(user.id).await?;
    let mut context = page_context(Some(&user));
    context.insert("todos", &todos);
    render(&state, "todo_list/tasks.html", &context)
}

/// GET /todos/add/
async fn add_page(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(Some(&user));
    insert_form(&mut context, &TaskForm::default(), &ValidationErrors::new());
    render(&state, "todo_list/add_task.html", &context)
}

/// POST /todos/add/
async fn add(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    form: FormData,
) -> Result<Response, HtmlError> {
    let name = form.value("name");
    let checked = form.get("state");

    let result = match todo::form_input(&name, checked) {
        Ok(input) => state.todo_service.create(user.id, input).await,
        Err(errors) => Err(TodoServiceError::Validation(errors)),
    };

    match result {
        Ok(_) => Ok(Redirect::to("/todos/").into_response()),
        Err(TodoServiceError::Validation(errors)) => {
            let raw = TaskForm {
                name,
                state: crate::services::validation::checkbox(checked),
            };
            let mut context = page_context(Some(&user));
            insert_form(&mut context, &raw, &errors);
            Ok(render(&state, "todo_list/add_task.html", &context)?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}
