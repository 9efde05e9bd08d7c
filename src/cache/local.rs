//! Local Cache Module
//!
//! Per-process snapshot cache with one slot per collection.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{Collection, Snapshot};

// == Cache State ==
/// State of one collection's slot.
///
/// An empty snapshot is `Populated`, distinct from `Unpopulated`, so an
/// empty collection is served from cache like any other.
#[derive(Debug, Clone, Default)]
pub enum CacheState {
    #[default]
    Unpopulated,
    Populated(Arc<Snapshot>),
}

impl CacheState {
    pub fn is_populated(&self) -> bool {
        matches!(self, CacheState::Populated(_))
    }
}

// == Local Cache ==
/// Snapshot slots guarded by one lock per collection.
///
/// Mutation is crate-private: only the coordinator may populate or invalidate.
#[derive(Debug, Default)]
pub struct LocalCache {
    slots: [RwLock<CacheState>; 2],
}

impl LocalCache {
    /// Creates a cache with every collection unpopulated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the collection's slot.
    pub async fn get(&self, collection: Collection) -> CacheState {
        self.slots[collection.index()].read().await.clone()
    }

    /// Marks the collection populated with `snapshot`.
    pub(crate) async fn set(&self, collection: Collection, snapshot: Arc<Snapshot>) {
        *self.slots[collection.index()].write().await = CacheState::Populated(snapshot);
    }

    /// Forces the collection back to unpopulated.
    pub(crate) async fn invalidate(&self, collection: Collection) {
        *self.slots[collection.index()].write().await = CacheState::Unpopulated;
    }
}
