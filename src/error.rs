//! Error types for the registry server
//!
//! Provides unified error handling using thiserror.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Message returned when a body is not JSON.
pub const NOT_JSON: &str = "Invalid request. data must be json. Make sure to set Content-Type header to application/json";

// == App Error Enum ==
/// Request-level error taxonomy. Every variant maps to a status and a short message.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing required field or non-JSON payload
    #[error("{0}")]
    Validation(String),

    /// Malformed email on a single create
    #[error("Invalid email address")]
    InvalidEmail,

    /// Malformed email inside a bulk upload
    #[error("Invalid email address at {0}")]
    InvalidEmailAt(String),

    /// Create on an existing key
    #[error("user already exists")]
    Duplicate,

    /// Get or delete on a missing key
    #[error("user not found")]
    NotFound,

    /// Empty email path parameter
    #[error("Invalid request. email is required")]
    MissingEmail,

    /// Durable store failure, fatal for the request
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    /// Missing or mistyped field, naming the expected `shape`.
    pub fn invalid_shape(shape: &str) -> Self {
        AppError::Validation(format!("Invalid user. data must be {}", shape))
    }

    /// Maps a body rejection. Valid JSON of the wrong shape is reported
    /// against `shape`; anything else is reported as not JSON.
    pub fn rejected(rejection: JsonRejection, shape: &str) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => AppError::invalid_shape(shape),
            _ => AppError::Validation(NOT_JSON.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_)
            | AppError::InvalidEmail
            | AppError::InvalidEmailAt(_)
            | AppError::Duplicate
            | AppError::MissingEmail => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(e) => {
                error!(error = %e, "durable store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Store Error Enum ==
/// Failures of the durable store. Never recovered locally.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("store unavailable")]
    Unavailable,
}

// == Tier Error Enum ==
/// Failures of the distributed cache tier.
///
/// Always recovered by the coordinator (treated as a miss) and never surfaced
/// to callers.
#[derive(Error, Debug)]
pub enum TierError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("distributed cache timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("distributed cache unavailable")]
    Unavailable,
}

// == Result Type Alias ==
/// Convenience Result type for request handling.
pub type Result<T> = std::result::Result<T, AppError>;
