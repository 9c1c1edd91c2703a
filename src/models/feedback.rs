//! Feedback model
//!
//! Feedback entries are never persisted; see `services::feedback`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submitted feedback entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    /// Position in submission order, starting at 1
    pub id: u64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

/// Raw feedback form as posted by the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}
