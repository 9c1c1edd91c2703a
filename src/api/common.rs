//! Common handler utilities and shared types
//!
//! Request body extractors shared by the HTML pages and the JSON API, plus
//! the helpers every HTML handler uses to render a page.

use axum::{
    extract::{
        multipart::MultipartError, rejection::FormRejection, FromRequest, Multipart, Request,
    },
    http::header,
    response::Html,
    Form, Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tera::Context;

use super::middleware::{ApiError, AppState, HtmlError};
use crate::models::{UploadedFile, User};

// ============================================================================
// Form bodies
// ============================================================================

/// URL-encoded form body keeping repeated keys (multi-selects) and
/// absent checkboxes distinguishable
#[derive(Debug, Clone, Default)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value posted under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value under `key`, empty when absent
    pub fn value(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Every value posted under `key`, in order
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state).await?;
        Ok(Self(pairs))
    }
}

/// A fully read `multipart/form-data` body.
///
/// Parts with a file name are files, everything else is a text field.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: FormData,
    pub files: Vec<(String, UploadedFile)>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut fields = Vec::new();
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?.to_vec();
                    files.push((
                        name,
                        UploadedFile {
                            filename: Some(filename),
                            content_type,
                            data,
                        },
                    ));
                }
                None => fields.push((name, field.text().await?)),
            }
        }

        Ok(Self {
            fields: FormData(fields),
            files,
        })
    }

    /// File posted under `name`
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// File posted under `name`, ignoring the empty part a browser sends for
    /// a file input left blank
    pub fn chosen_file(&self, name: &str) -> Option<&UploadedFile> {
        self.file(name).filter(|f| {
            !(f.data.is_empty() && f.filename.as_deref().map_or(true, str::is_empty))
        })
    }
}

// ============================================================================
// JSON bodies
// ============================================================================

/// JSON request body that must be an object.
///
/// Field types are checked by the caller so the error can name the field.
#[derive(Debug, Clone)]
pub struct JsonObject(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation_error(format!("JSON parse error - {}", e.body_text())))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ApiError::validation_error(
                "Invalid data. Expected a dictionary.",
            )),
        }
    }
}

/// Whether the request body is `multipart/form-data`
pub fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("multipart/form-data"))
}

// ============================================================================
// Page rendering
// ============================================================================

/// Base context of every HTML page
pub fn page_context(user: Option<&User>) -> Context {
    let mut context = Context::new();
    if let Some(user) = user {
        context.insert("current_user", user);
    }
    context
}

/// Render `template`, turning failures into a 500 page
pub fn render(state: &AppState, template: &str, context: &Context) -> Result<Html<String>, HtmlError> {
    Ok(Html(state.templates.render(template, context)?))
}

/// Insert the raw form and its errors for re-display
pub fn insert_form<T: Serialize>(
    context: &mut Context,
    form: &T,
    errors: &crate::services::ValidationErrors,
) {
    context.insert("form", form);
    context.insert("errors", errors);
}

/// Local redirect target taken from a `next` parameter.
///
/// Anything that is not a path on this site is replaced by `default`.
/// Browsers drop tabs and newlines from URLs, so a target holding control
/// characters or whitespace is refused outright.
pub fn safe_next<'a>(next: Option<&'a str>, default: &'a str) -> &'a str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path
        }
        _ => default,
    }
}
