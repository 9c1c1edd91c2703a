//! Task API endpoints
//!
//! Every route is scoped to the authenticated user; another user's task is
//! reported as missing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::common::JsonObject;
use super::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Todo;
use crate::services::todo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks/", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}/",
            get(get_task)
                .patch(patch_task)
                .put(replace_task)
                .delete(delete_task),
        )
}

/// GET /api/tasks/
async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.todo_service.list(user.id).await?))
}

/// POST /api/tasks/
async fn create_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let input = todo::json_input(&body)?;
    let task = state.todo_service.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks/{id}/
async fn get_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.todo_service.get(user.id, id).await?))
}

/// PATCH /api/tasks/{id}/
async fn patch_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    JsonObject(body): JsonObject,
) -> Result<Json<Todo>, ApiError> {
    let patch = todo::json_patch(&body)?;
    Ok(Json(state.todo_service.patch(user.id, id, patch).await?))
}

/// PUT /api/tasks/{id}/
async fn replace_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    JsonObject(body): JsonObject,
) -> Result<Json<Todo>, ApiError> {
    let input = todo::json_input(&body)?;
    Ok(Json(state.todo_service.replace(user.id, id, input).await?))
}

/// DELETE /api/tasks/{id}/
async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.todo_service.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
