//! SQLite durable store backend.
//!
//! One table keyed by `(collection, email)`; payloads are JSON text.

use std::str::FromStr;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use tracing::info;

use super::{DurableStore, RecordStream};
use crate::error::StoreError;
use crate::models::{Collection, RecordFields};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS records (
        collection TEXT NOT NULL,
        email TEXT NOT NULL,
        payload TEXT NOT NULL,
        PRIMARY KEY (collection, email)
    );
";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `database_url` and applies the schema.
    ///
    /// # Errors
    /// Returns `StoreError::Database` if the URL is invalid or the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url = %database_url, "durable store opened");
        Ok(store)
    }

    /// Private in-memory database. Pinned to a single connection so the data
    /// lives as long as the store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    fn decode_row(
        collection: Collection,
        row: &SqliteRow,
    ) -> Result<(String, RecordFields), StoreError> {
        let email: String = row.try_get("email")?;
        let payload: String = row.try_get("payload")?;
        let fields = RecordFields::from_payload(collection, serde_json::from_str(&payload)?)?;
        Ok((email, fields))
    }

    fn encode(fields: &RecordFields) -> Result<String, StoreError> {
        Ok(serde_json::to_string(&fields.to_payload())?)
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn get(
        &self,
        collection: Collection,
        email: &str,
    ) -> Result<Option<RecordFields>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT email, payload FROM records
            WHERE collection = ? AND email = ?
            ",
        )
        .bind(collection.tag())
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::decode_row(collection, &row).map(|(_, fields)| fields))
            .transpose()
    }

    async fn set(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO records (collection, email, payload) VALUES (?, ?, ?)
            ON CONFLICT (collection, email) DO UPDATE SET payload = excluded.payload
            ",
        )
        .bind(collection.tag())
        .bind(email)
        .bind(Self::encode(fields)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_if_absent(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO records (collection, email, payload) VALUES (?, ?, ?)
            ON CONFLICT (collection, email) DO NOTHING
            ",
        )
        .bind(collection.tag())
        .bind(email)
        .bind(Self::encode(fields)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, collection: Collection, email: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND email = ?")
            .bind(collection.tag())
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn scan(&self, collection: Collection) -> RecordStream<'_> {
        sqlx::query(
            r"
            SELECT email, payload FROM records
            WHERE collection = ?
            ORDER BY email
            ",
        )
        .bind(collection.tag())
        .fetch(&self.pool)
        .map_err(StoreError::from)
        .and_then(move |row| futures::future::ready(Self::decode_row(collection, &row)))
        .boxed()
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("durable store closed");
    }
}
