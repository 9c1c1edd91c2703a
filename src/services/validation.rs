//! Field validation
//!
//! Validation never aborts on the first problem: every field is checked and
//! the failures are collected in [`ValidationErrors`], an ordered map from
//! field name to messages. HTML forms re-render it next to the inputs; the
//! JSON API returns it as the 400 body.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// User-facing validation messages
pub mod messages {
    pub const REQUIRED: &str = "This field is required.";
    pub const BLANK: &str = "This field may not be blank.";
    pub const NULL: &str = "This field may not be null.";
    pub const NOT_A_STRING: &str = "Not a valid string.";
    pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
    pub const INVALID_EMAIL: &str = "Enter a valid email address.";
    pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
    pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
    pub const NOT_A_FILE: &str =
        "The submitted data was not a file. Check the encoding type on the form.";
    pub const EMPTY_FILE: &str = "The submitted file is empty.";
    pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
    pub const INVALID_DATE: &str = "Enter a valid date.";
    pub const INVALID_CHOICE: &str =
        "Select a valid choice. That choice is not one of the available choices.";
    pub const INVALID_INTEGER: &str = "Enter a whole number.";
    pub const INVALID_JSON: &str = "Malformed request body.";

    pub fn max_length(limit: usize) -> String {
        format!("Ensure this field has no more than {} characters.", limit)
    }

    pub fn file_too_large(limit: u64) -> String {
        format!("The file is too large. Maximum size is {} bytes.", limit)
    }
}

/// Per-field validation failures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Record the error side of a field check and keep the value
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    /// `Ok(value)` when nothing failed
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("email regex is valid")
});

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username regex is valid"));

/// Longest accepted email address
pub const EMAIL_MAX_LENGTH: usize = 254;
/// Longest accepted username
pub const USERNAME_MAX_LENGTH: usize = 150;

/// Whether `value` looks like a deliverable email address
pub fn is_valid_email(value: &str) -> bool {
    value.len() <= EMAIL_MAX_LENGTH && EMAIL_RE.is_match(value)
}

/// Trim and length-check a text value.
///
/// `blank` is the message for an empty value, or `None` when blank is allowed.
pub fn text(value: &str, max: usize, blank: Option<&str>) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return match blank {
            Some(message) => Err(message.to_string()),
            None => Ok(String::new()),
        };
    }
    if trimmed.chars().count() > max {
        return Err(messages::max_length(max));
    }
    Ok(trimmed.to_string())
}

/// Optional email: blank is allowed, anything else must be valid
pub fn optional_email(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.chars().count() > EMAIL_MAX_LENGTH {
        return Err(messages::max_length(EMAIL_MAX_LENGTH));
    }
    if !is_valid_email(trimmed) {
        return Err(messages::INVALID_EMAIL.to_string());
    }
    Ok(trimmed.to_string())
}

/// Required email
pub fn required_email(value: &str, blank: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err(blank.to_string());
    }
    optional_email(value)
}

/// Username format check (uniqueness is the caller's job)
pub fn username(value: &str, blank: &str) -> Result<String, String> {
    let name = text(value, USERNAME_MAX_LENGTH, Some(blank))?;
    if !USERNAME_RE.is_match(&name) {
        return Err(messages::INVALID_USERNAME.to_string());
    }
    Ok(name)
}

/// Optional `YYYY-MM-DD` date; blank means no date
pub fn optional_date(value: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| messages::INVALID_DATE.to_string())
}

/// HTML checkbox semantics: absent, empty or "false" is unchecked
pub fn checkbox(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => !(v.is_empty() || v.eq_ignore_ascii_case("false")),
    }
}

/// Strictly positive integer id
pub fn positive_id(value: &str) -> Result<i64, String> {
    match value.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err(messages::INVALID_CHOICE.to_string()),
        Err(_) => Err(messages::INVALID_INTEGER.to_string()),
    }
}

/// Read a string field from a JSON object.
///
/// Absent fields give `Ok(None)`. Numbers are accepted and stringified;
/// `null`, booleans, arrays and objects are rejected.
pub fn json_string(body: &Map<String, Value>, field: &str) -> Result<Option<String>, String> {
    match body.get(field) {
        None => Ok(None),
        Some(Value::Null) => Err(messages::NULL.to_string()),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(messages::NOT_A_STRING.to_string()),
    }
}

/// Read a boolean field from a JSON object, accepting the usual spellings
pub fn json_bool(body: &Map<String, Value>, field: &str) -> Result<Option<bool>, String> {
    match body.get(field) {
        None => Ok(None),
        Some(Value::Null) => Err(messages::NULL.to_string()),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Ok(Some(true)),
            Some(0) => Ok(Some(false)),
            _ => Err(messages::NOT_A_BOOLEAN.to_string()),
        },
        Some(Value::String(s)) => parse_bool(s)
            .map(Some)
            .ok_or_else(|| messages::NOT_A_BOOLEAN.to_string()),
        Some(_) => Err(messages::NOT_A_BOOLEAN.to_string()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Accepted text is always trimmed and within the limit
        #[test]
        fn prop_text_respects_limit(value in ".{0,40}", max in 1usize..30) {
            if let Ok(clean) = text(&value, max, None) {
                prop_assert!(clean.chars().count() <= max);
                prop_assert_eq!(clean.trim(), clean.as_str());
            }
        }

        /// Usernames built from the allowed alphabet are accepted
        #[test]
        fn prop_valid_usernames_accepted(name in "[A-Za-z0-9@.+_-]{1,150}") {
            prop_assert_eq!(username(&name, messages::BLANK), Ok(name.clone()));
        }

        /// Any whitespace inside a username is rejected
        #[test]
        fn prop_usernames_with_spaces_rejected(a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
            let name = format!("{} {}", a, b);
            prop_assert!(username(&name, messages::BLANK).is_err());
        }

        /// Simple local@domain.tld addresses validate
        #[test]
        fn prop_simple_emails_valid(local in "[a-z0-9]{1,20}", domain in "[a-z]{1,20}", tld in "[a-z]{2,6}") {
            let email = format!("{}@{}.{}", local, domain, tld);
            prop_assert!(is_valid_email(&email));
        }

        /// Strings without an @ never validate
        #[test]
        fn prop_emails_need_at_sign(value in "[^@]{0,40}") {
            prop_assert!(!is_valid_email(&value));
        }
    }
}
