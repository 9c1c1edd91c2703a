//! Feedback store
//!
//! Submitted feedback lives in process memory for the lifetime of the server
//! and is lost on restart. Ids are handed out under the write lock, so the
//! listing order is the order in which submissions committed.

use crate::models::{Feedback, FeedbackForm};
use crate::services::validation::{self, messages, ValidationErrors};
use chrono::Utc;
use tokio::sync::RwLock;

pub const NAME_MAX_LENGTH: usize = 100;
pub const MESSAGE_MAX_LENGTH: usize = 1000;

#[derive(Default)]
struct Entries {
    items: Vec<Feedback>,
    next_id: u64,
}

/// Shared in-memory feedback list
#[derive(Default)]
pub struct FeedbackStore {
    entries: RwLock<Entries>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a form and append it, returning the stored entry
    pub async fn submit(&self, form: &FeedbackForm) -> Result<Feedback, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.check(
            "name",
            validation::text(&form.name, NAME_MAX_LENGTH, Some(messages::REQUIRED)),
        );
        let email = errors.check(
            "email",
            validation::required_email(&form.email, messages::REQUIRED),
        );
        let message = errors.check(
            "message",
            validation::text(&form.message, MESSAGE_MAX_LENGTH, Some(messages::REQUIRED)),
        );

        let (name, email, message) = match (name, email, message) {
            (Some(n), Some(e), Some(m)) if errors.is_empty() => (n, e, m),
            _ => return Err(errors),
        };

        let mut entries = self.entries.write().await;
        entries.next_id += 1;
        let feedback = Feedback {
            id: entries.next_id,
            name,
            email,
            message,
            submitted_at: Utc::now(),
        };
        entries.items.push(feedback.clone());
        tracing::debug!(id = feedback.id, "feedback stored");
        Ok(feedback)
    }

    /// Snapshot of every entry in submission order
    pub async fn list(&self) -> Vec<Feedback> {
        self.entries.read().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn form(name: &str, email: &str, message: &str) -> FeedbackForm {
        FeedbackForm {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_submission_appends_one() {
        let store = FeedbackStore::new();
        let entry = store
            .submit(&form(" Ann ", "ann@example.com", "Great site"))
            .await
            .unwrap();

        assert_eq!(entry.id, 1);
        assert_eq!(entry.name, "Ann");
        assert_eq!(store.len().await, 1);
        assert_eq!(store.list().await[0], entry);
    }

    #[tokio::test]
    async fn test_invalid_submission_leaves_list_unchanged() {
        let store = FeedbackStore::new();
        store
            .submit(&form("Ann", "ann@example.com", "hi"))
            .await
            .unwrap();

        let errors = store
            .submit(&form("", "not-an-email", &"m".repeat(1001)))
            .await
            .unwrap_err();
        assert_eq!(errors.get("name").unwrap(), &[messages::REQUIRED.to_string()]);
        assert_eq!(errors.get("email").unwrap(), &[messages::INVALID_EMAIL.to_string()]);
        assert_eq!(errors.get("message").unwrap(), &[messages::max_length(1000)]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_get_distinct_increasing_ids() {
        let store = Arc::new(FeedbackStore::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .submit(&form(&format!("user{}", i), "u@example.com", "hello"))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let ids: Vec<u64> = store.list().await.iter().map(|f| f.id).collect();
        assert_eq!(ids, (1..=50).collect::<Vec<u64>>());
    }
}
