//! Request and Response models for the registry API
//!
//! This module defines the record data model plus the DTOs used for
//! serializing/deserializing HTTP request and response bodies.

pub mod record;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use record::{Collection, GoalFields, QuizFields, Record, RecordFields, Snapshot};
pub use requests::{is_valid_email, GoalRequest, QuizRequest};
pub use responses::{
    BulkResponse, ErrorResponse, HealthResponse, MessageResponse, StatsResponse,
};
