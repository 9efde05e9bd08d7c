//! Request DTOs for the registry API
//!
//! Defines the structure of incoming HTTP request bodies and their validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::RecordFields;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Returns true if `email` has the `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/// Request body for POST /quiz
///
/// Fields are optional at the serde level so that a missing field is reported
/// with the expected shape instead of a deserializer message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl QuizRequest {
    pub const SHAPE: &'static str = "{name: string, email: string}";

    /// Validates the request, returning the key and payload on success.
    pub fn validate(&self) -> Result<(String, RecordFields), AppError> {
        let (Some(name), Some(email)) = (present(&self.name), present(&self.email)) else {
            return Err(AppError::invalid_shape(Self::SHAPE));
        };

        if !is_valid_email(email) {
            return Err(AppError::InvalidEmail);
        }

        Ok((email.to_string(), RecordFields::quiz(name)))
    }
}

/// Request body for POST /goal and one element of POST /goal/uploadJSON
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GoalRequest {
    pub const SHAPE: &'static str =
        "{name: string, institution: string, location: string, email: string}";

    /// Validates the request, returning the key and payload on success.
    pub fn validate(&self) -> Result<(String, RecordFields), AppError> {
        let (Some(name), Some(institution), Some(location), Some(email)) = (
            present(&self.name),
            present(&self.institution),
            present(&self.location),
            present(&self.email),
        ) else {
            return Err(AppError::invalid_shape(Self::SHAPE));
        };

        if !is_valid_email(email) {
            return Err(AppError::InvalidEmail);
        }

        Ok((
            email.to_string(),
            RecordFields::goal(name, institution, location),
        ))
    }
}
