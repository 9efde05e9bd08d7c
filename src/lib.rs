//! Roster - quiz and goal participant registry
//!
//! Serves two email-keyed collections through a read-through,
//! write-invalidate cache: process-local slots over a distributed cache over
//! a durable store.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod service;
pub mod store;

pub use api::AppState;
pub use config::Config;
