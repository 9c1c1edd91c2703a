//! Plain-text greetings

use axum::{
    extract::{Path, Query},
    routing::get,
    Router,
};
use serde::Deserialize;

use super::middleware::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(hello_world))
        .route("/{name}/", get(greet))
}

#[derive(Debug, Deserialize)]
pub struct GreetQuery {
    pub greet: Option<String>,
}

/// GET /
async fn hello_world() -> &'static str {
    "Hello, World!"
}

/// GET /{name}/?greet=
async fn greet(Path(name): Path<String>, Query(query): Query<GreetQuery>) -> String {
    greeting(query.greet.as_deref(), &name)
}

/// `greet` is used as given, even when empty
pub fn greeting(greet: Option<&str>, name: &str) -> String {
    format!("{}, {}!", greet.unwrap_or("Hello"), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting() {
        assert_eq!(greeting(None, "Ana"), "Hello, Ana!");
        assert_eq!(greeting(Some("Hi"), "Ana"), "Hi, Ana!");
        assert_eq!(greeting(Some(""), "Ana"), ", Ana!");
    }
}
