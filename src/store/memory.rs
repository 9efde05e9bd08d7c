//! In-memory durable store backend, for tests and ephemeral runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::RwLock;

use super::{DurableStore, RecordStream};
use crate::error::StoreError;
use crate::models::{Collection, RecordFields};

type Entries = BTreeMap<(Collection, String), RecordFields>;

/// Ordered map keyed by `(collection, email)`.
///
/// Cloning yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Entries>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of records across all collections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(
        &self,
        collection: Collection,
        email: &str,
    ) -> Result<Option<RecordFields>, StoreError> {
        self.check_online()?;
        let entries = self.entries.read().await;
        Ok(entries.get(&(collection, email.to_string())).cloned())
    }

    async fn set(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut entries = self.entries.write().await;
        entries.insert((collection, email.to_string()), fields.clone());
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        // Check and write under one write guard
        let mut entries = self.entries.write().await;
        let key = (collection, email.to_string());
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, fields.clone());
        Ok(true)
    }

    async fn delete(&self, collection: Collection, email: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&(collection, email.to_string())).is_some())
    }

    fn scan(&self, collection: Collection) -> RecordStream<'_> {
        if let Err(e) = self.check_online() {
            return stream::iter(vec![Err::<(String, RecordFields), _>(e)]).boxed();
        }

        let entries = Arc::clone(&self.entries);
        stream::once(async move {
            let guard = entries.read().await;
            let items: Vec<_> = guard
                .range((collection, String::new())..)
                .take_while(|((c, _), _)| *c == collection)
                .map(|((_, email), fields)| Ok::<_, StoreError>((email.clone(), fields.clone())))
                .collect();
            stream::iter(items)
        })
        .flatten()
        .boxed()
    }
}
