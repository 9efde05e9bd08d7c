//! API Module
//!
//! HTTP handlers and routing for the registry REST API.
//!
//! # Endpoints
//! - `GET /` - Welcome text
//! - `POST /quiz`, `POST /goal` - Register a participant
//! - `GET /quiz`, `GET /goal` - List a collection
//! - `GET /quiz/render`, `GET /goal/render` - List a collection as HTML
//! - `GET /quiz/:email`, `GET /goal/:email` - Fetch one participant
//! - `DELETE /quiz/:email`, `DELETE /goal/:email` - Remove a participant
//! - `POST /goal/uploadJSON` - Bulk goal upload
//! - `GET /stats` - Cache tier statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
