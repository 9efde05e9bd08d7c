//! Durable Store Module
//!
//! Source of truth for records: an ordered key-value store keyed by
//! `(collection, email)` with point operations and prefix scans.

mod memory;
mod sqlite;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::models::{Collection, RecordFields};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Stream of `(email, fields)` pairs produced by a scan, ordered by email.
pub type RecordStream<'a> = BoxStream<'a, Result<(String, RecordFields), StoreError>>;

/// Durable store facade.
///
/// Every failure propagates; nothing here is retried or swallowed.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Point lookup.
    async fn get(&self, collection: Collection, email: &str)
        -> Result<Option<RecordFields>, StoreError>;

    /// Unconditional write, replacing any existing record.
    async fn set(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<(), StoreError>;

    /// Writes only when no record exists for the key, atomically.
    ///
    /// Returns `true` if the record was inserted.
    async fn insert_if_absent(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<bool, StoreError>;

    /// Removes the record. Returns `true` if one existed.
    async fn delete(&self, collection: Collection, email: &str) -> Result<bool, StoreError>;

    /// Full scan of one collection. Each call opens a fresh cursor.
    fn scan(&self, collection: Collection) -> RecordStream<'_>;

    /// Releases backend resources on shutdown.
    async fn close(&self) {}
}
