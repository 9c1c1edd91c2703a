//! Photo gallery

use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use super::common::{insert_form, page_context, render, MultipartForm};
use super::middleware::{AppState, CurrentUser, HtmlError};
use crate::models::User;
use crate::services::{validation::messages, PhotoServiceError, ValidationErrors};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gallery/", get(gallery))
        .route("/gallery/upload/", get(upload_page).post(upload))
}

#[derive(Debug, Default, Serialize)]
struct UploadForm {
    title: String,
}

fn upload_form(
    state: &AppState,
    user: Option<&User>,
    form: &UploadForm,
    errors: &ValidationErrors,
) -> Result<Html<String>, HtmlError> {
    let mut context = page_context(user);
    insert_form(&mut context, form, errors);
    render(state, "image_share/upload.html", &context)
}

/// GET /gallery/
async fn gallery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    let photos = state.photo_service.gallery().await?;
    let mut context = page_context(user.as_ref());
    context.insert("photos", &photos);
    render(&state, "image_share/gallery.html", &context)
}

/// GET /gallery/upload/
async fn upload_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, HtmlError> {
    upload_form(&state, user.as_ref(), &UploadForm::default(), &ValidationErrors::new())
}

/// POST /gallery/upload/
async fn upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response, HtmlError> {
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable gallery upload");
            let errors = ValidationErrors::single("image", messages::NOT_A_FILE);
            return Ok(
                upload_form(&state, user.as_ref(), &UploadForm::default(), &errors)?
                    .into_response(),
            );
        }
    };

    let title = form.fields.value("title");
    match state
        .photo_service
        .upload(&title, form.chosen_file("image"))
        .await
    {
        Ok(_) => Ok(Redirect::to("/gallery/").into_response()),
        Err(PhotoServiceError::Validation(errors)) => Ok(upload_form(
            &state,
            user.as_ref(),
            &UploadForm { title },
            &errors,
        )?
        .into_response()),
        Err(e) => Err(e.into()),
    }
}
