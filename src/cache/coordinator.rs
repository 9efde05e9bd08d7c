//! Cache Coordinator Module
//!
//! Read-through / write-invalidate pipeline over three tiers:
//! local cache, distributed cache, durable store.
//!
//! # Ordering
//!
//! Each collection has a gate (an async mutex). Every mutation holds it across
//! the store write and the invalidation of both tiers, and every population
//! holds it across the tier lookups, the scan, and both tier writes. A listing
//! that finds the local tier populated needs only the slot's read lock.
//!
//! Consequently, once an invalidation has returned, no listing started after
//! it can observe a snapshot built before it: a population that raced the
//! mutation either finished before the gate passed to the writer (and was
//! wiped by the invalidation) or starts after it and scans the new state.
//!
//! The gate only orders requests inside one process. For the shared tier,
//! a population reads the key's generation before scanning and publishes
//! with `set_if_generation`, so a snapshot scanned before another process's
//! invalidation is dropped instead of stored. Another process's local slot is
//! not reached by this; it keeps its snapshot until that process writes.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{future, TryStreamExt};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::local::{CacheState, LocalCache};
use super::stats::{CacheStats, StatsRecorder};
use super::DistributedCache;
use crate::error::{StoreError, TierError};
use crate::models::{Collection, Record, RecordFields, Snapshot};
use crate::store::DurableStore;

/// Default bound on each distributed-cache call.
pub const DEFAULT_TIER_TIMEOUT: Duration = Duration::from_millis(500);

// == Outcomes ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

// == Per-Collection Slot ==
#[derive(Debug, Default)]
struct Gate {
    lock: Mutex<()>,
    /// Set when a distributed invalidation failed, so the remote copy may be
    /// stale. Cleared by the next successful distributed publish or invalidation.
    remote_suspect: AtomicBool,
}

// == Cache Coordinator ==
/// Sole owner of cache state. Constructed once at startup and shared by reference.
pub struct CacheCoordinator {
    store: Arc<dyn DurableStore>,
    distributed: Arc<dyn DistributedCache>,
    local: LocalCache,
    gates: [Gate; 2],
    stats: StatsRecorder,
    tier_timeout: Duration,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn DurableStore>, distributed: Arc<dyn DistributedCache>) -> Self {
        Self::with_tier_timeout(store, distributed, DEFAULT_TIER_TIMEOUT)
    }

    pub fn with_tier_timeout(
        store: Arc<dyn DurableStore>,
        distributed: Arc<dyn DistributedCache>,
        tier_timeout: Duration,
    ) -> Self {
        Self {
            store,
            distributed,
            local: LocalCache::new(),
            gates: Default::default(),
            stats: StatsRecorder::new(),
            tier_timeout,
        }
    }

    /// Current tier counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// The process-local tier, for inspection.
    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Releases durable store resources.
    pub async fn close(&self) {
        self.store.close().await;
    }

    fn gate(&self, collection: Collection) -> &Gate {
        &self.gates[collection.index()]
    }

    async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        self.gate(collection).lock.lock().await
    }

    // == ListRecords ==
    /// Returns the collection's snapshot from the fastest tier that has one,
    /// populating faster tiers on the way back.
    pub async fn list_records(&self, collection: Collection) -> Result<Arc<Snapshot>, StoreError> {
        if let CacheState::Populated(snapshot) = self.local.get(collection).await {
            debug!(collection = %collection, "cache hit (local)");
            self.stats.record_local_hit();
            return Ok(snapshot);
        }

        let _gate = self.lock(collection).await;

        // Another request may have populated the slot while we waited
        if let CacheState::Populated(snapshot) = self.local.get(collection).await {
            debug!(collection = %collection, "cache hit (local, after wait)");
            self.stats.record_local_hit();
            return Ok(snapshot);
        }

        if let Some(snapshot) = self.fetch_distributed(collection).await {
            debug!(collection = %collection, records = snapshot.len(), "cache hit (distributed)");
            self.stats.record_distributed_hit();
            self.local.set(collection, Arc::clone(&snapshot)).await;
            return Ok(snapshot);
        }

        // Read before scanning so an invalidation racing the scan, from any
        // process, makes the publish below a no-op
        let generation = self.remote_generation(collection).await;

        let snapshot = Arc::new(self.scan(collection).await?);
        self.stats.record_scan();
        debug!(collection = %collection, records = snapshot.len(), "populated from store scan");

        self.local.set(collection, Arc::clone(&snapshot)).await;
        if let Some(generation) = generation {
            self.publish_distributed(collection, &snapshot, generation)
                .await;
        }

        Ok(snapshot)
    }

    // == GetRecord ==
    /// Point lookup straight from the durable store; never cached.
    pub async fn get_record(
        &self,
        collection: Collection,
        email: &str,
    ) -> Result<Option<RecordFields>, StoreError> {
        self.store.get(collection, email).await
    }

    // == CreateRecord ==
    /// Inserts the record unless the email is already taken.
    pub async fn create_record(
        &self,
        collection: Collection,
        email: &str,
        fields: &RecordFields,
    ) -> Result<CreateOutcome, StoreError> {
        let _gate = self.lock(collection).await;

        if !self.store.insert_if_absent(collection, email, fields).await? {
            debug!(collection = %collection, email = %email, "duplicate create rejected");
            return Ok(CreateOutcome::Duplicate);
        }

        self.invalidate(collection).await;
        Ok(CreateOutcome::Created)
    }

    // == DeleteRecord ==
    pub async fn delete_record(
        &self,
        collection: Collection,
        email: &str,
    ) -> Result<DeleteOutcome, StoreError> {
        let _gate = self.lock(collection).await;

        if !self.store.delete(collection, email).await? {
            return Ok(DeleteOutcome::NotFound);
        }

        self.invalidate(collection).await;
        Ok(DeleteOutcome::Deleted)
    }

    // == BulkCreate ==
    /// Writes already-validated records concurrently, then invalidates once.
    ///
    /// Later entries with the same email replace earlier ones. Returns the
    /// number of distinct emails written. If any write fails the first error
    /// is returned, but the caches are still invalidated because earlier
    /// writes may have landed.
    pub async fn bulk_create(
        &self,
        collection: Collection,
        records: Vec<(String, RecordFields)>,
    ) -> Result<usize, StoreError> {
        let unique: BTreeMap<String, RecordFields> = records.into_iter().collect();
        if unique.is_empty() {
            return Ok(0);
        }

        let _gate = self.lock(collection).await;

        let results = future::join_all(
            unique
                .iter()
                .map(|(email, fields)| self.store.set(collection, email, fields)),
        )
        .await;

        self.invalidate(collection).await;

        results.into_iter().collect::<Result<Vec<()>, _>>()?;
        Ok(unique.len())
    }

    // == Invalidation ==
    /// Returns both tiers of the collection to unpopulated. Caller holds the gate.
    async fn invalidate(&self, collection: Collection) {
        self.local.invalidate(collection).await;
        self.stats.record_invalidation();

        let gate = self.gate(collection);
        match self
            .bounded(self.distributed.invalidate(collection.tag()))
            .await
        {
            Ok(()) => {
                gate.remote_suspect.store(false, Ordering::SeqCst);
                debug!(collection = %collection, "cache invalidated (local+distributed)");
            }
            Err(e) => {
                gate.remote_suspect.store(true, Ordering::SeqCst);
                self.stats.record_tier_failure();
                warn!(collection = %collection, error = %e, "distributed invalidation failed");
            }
        }
    }

    // == Tier Helpers ==
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, TierError>>,
    ) -> Result<T, TierError> {
        tokio::time::timeout(self.tier_timeout, call)
            .await
            .map_err(|_| TierError::Timeout(self.tier_timeout))?
    }

    /// Reads the distributed snapshot; any failure or bad payload is a miss.
    async fn fetch_distributed(&self, collection: Collection) -> Option<Arc<Snapshot>> {
        if self.gate(collection).remote_suspect.load(Ordering::SeqCst) {
            debug!(collection = %collection, "skipping distributed tier after failed invalidation");
            return None;
        }

        let raw = match self.bounded(self.distributed.get(collection.tag())).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(collection = %collection, "cache miss (distributed)");
                return None;
            }
            Err(e) => {
                self.stats.record_tier_failure();
                warn!(collection = %collection, error = %e, "distributed cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) if snapshot.is_shaped_for(collection) => Some(Arc::new(snapshot)),
            Ok(_) => {
                warn!(collection = %collection, "distributed snapshot has wrong record shape");
                None
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "distributed snapshot is not valid JSON");
                None
            }
        }
    }

    /// Generation of the collection's distributed key, or `None` if the tier
    /// cannot be reached.
    async fn remote_generation(&self, collection: Collection) -> Option<u64> {
        match self
            .bounded(self.distributed.generation(collection.tag()))
            .await
        {
            Ok(generation) => Some(generation),
            Err(e) => {
                self.stats.record_tier_failure();
                warn!(collection = %collection, error = %e, "distributed generation read failed");
                None
            }
        }
    }

    /// Best-effort write of a freshly scanned snapshot, skipped if the
    /// collection was invalidated since `generation` was read. Caller holds the gate.
    async fn publish_distributed(
        &self,
        collection: Collection,
        snapshot: &Snapshot,
        generation: u64,
    ) {
        let payload = match serde_json::to_string(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(collection = %collection, error = %e, "failed to encode snapshot");
                return;
            }
        };

        match self
            .bounded(
                self.distributed
                    .set_if_generation(collection.tag(), &payload, generation),
            )
            .await
        {
            Ok(true) => {
                self.gate(collection)
                    .remote_suspect
                    .store(false, Ordering::SeqCst);
            }
            Ok(false) => {
                debug!(collection = %collection, generation, "snapshot superseded by a newer invalidation");
            }
            Err(e) => {
                self.stats.record_tier_failure();
                warn!(collection = %collection, error = %e, "distributed cache write failed");
            }
        }
    }

    async fn scan(&self, collection: Collection) -> Result<Snapshot, StoreError> {
        let records: Vec<Record> = self
            .store
            .scan(collection)
            .map_ok(|(email, fields)| Record::new(email, fields))
            .try_collect()
            .await?;

        Ok(Snapshot::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::store::{MemoryStore, RecordStream};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    // == Test Tiers ==
    /// Distributed tier whose conditional publish parks until released.
    struct HeldPublish {
        inner: MemoryCache,
        reached: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl DistributedCache for HeldPublish {
        async fn get(&self, key: &str) -> Result<Option<String>, TierError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), TierError> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), TierError> {
            self.inner.delete(key).await
        }

        async fn generation(&self, key: &str) -> Result<u64, TierError> {
            self.inner.generation(key).await
        }

        async fn set_if_generation(
            &self,
            key: &str,
            value: &str,
            generation: u64,
        ) -> Result<bool, TierError> {
            self.reached.notify_one();
            self.release.notified().await;
            self.inner.set_if_generation(key, value, generation).await
        }

        async fn invalidate(&self, key: &str) -> Result<(), TierError> {
            self.inner.invalidate(key).await
        }
    }

    /// Distributed tier that never answers.
    struct Hanging;

    #[async_trait]
    impl DistributedCache for Hanging {
        async fn get(&self, _key: &str) -> Result<Option<String>, TierError> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), TierError> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<(), TierError> {
            std::future::pending().await
        }

        async fn generation(&self, _key: &str) -> Result<u64, TierError> {
            std::future::pending().await
        }

        async fn set_if_generation(
            &self,
            _key: &str,
            _value: &str,
            _generation: u64,
        ) -> Result<bool, TierError> {
            std::future::pending().await
        }

        async fn invalidate(&self, _key: &str) -> Result<(), TierError> {
            std::future::pending().await
        }
    }

    /// Store whose unconditional writes fail for one email.
    struct FailingWrite {
        inner: MemoryStore,
        email: &'static str,
    }

    #[async_trait]
    impl DurableStore for FailingWrite {
        async fn get(
            &self,
            collection: Collection,
            email: &str,
        ) -> Result<Option<RecordFields>, StoreError> {
            self.inner.get(collection, email).await
        }

        async fn set(
            &self,
            collection: Collection,
            email: &str,
            fields: &RecordFields,
        ) -> Result<(), StoreError> {
            if email == self.email {
                return Err(StoreError::Unavailable);
            }
            self.inner.set(collection, email, fields).await
        }

        async fn insert_if_absent(
            &self,
            collection: Collection,
            email: &str,
            fields: &RecordFields,
        ) -> Result<bool, StoreError> {
            self.inner.insert_if_absent(collection, email, fields).await
        }

        async fn delete(&self, collection: Collection, email: &str) -> Result<bool, StoreError> {
            self.inner.delete(collection, email).await
        }

        fn scan(&self, collection: Collection) -> RecordStream<'_> {
            self.inner.scan(collection)
        }
    }

    struct Harness {
        store: MemoryStore,
        remote: MemoryCache,
        coordinator: Arc<CacheCoordinator>,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let remote = MemoryCache::new();
        let coordinator = Arc::new(CacheCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(remote.clone()),
        ));
        Harness {
            store,
            remote,
            coordinator,
        }
    }

    fn quiz(name: &str) -> RecordFields {
        RecordFields::quiz(name)
    }

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let h = harness();

        let first = h
            .coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();
        let second = h
            .coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Other"))
            .await
            .unwrap();

        assert_eq!(first, CreateOutcome::Created);
        assert_eq!(second, CreateOutcome::Duplicate);
        assert_eq!(
            h.coordinator
                .get_record(Collection::Quiz, "ann@x.com")
                .await
                .unwrap(),
            Some(quiz("Ann"))
        );
    }

    #[tokio::test]
    async fn test_list_falls_through_tiers_in_order() {
        let h = harness();
        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();

        // Miss both caches: scan and populate
        let first = h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert_eq!(h.coordinator.stats().store_scans, 1);
        assert!(h.remote.peek("quiz").await.is_some());

        // Local hit
        let second = h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(h.coordinator.stats().local_hits, 1);
    }

    #[tokio::test]
    async fn test_second_process_reads_from_distributed_tier() {
        let h = harness();
        h.coordinator
            .create_record(Collection::Goal, "ann@x.com", &RecordFields::goal("Ann", "MIT", "Boston"))
            .await
            .unwrap();
        let from_scan = h.coordinator.list_records(Collection::Goal).await.unwrap();

        let other = CacheCoordinator::new(Arc::new(h.store.clone()), Arc::new(h.remote.clone()));
        let from_remote = other.list_records(Collection::Goal).await.unwrap();

        assert_eq!(*from_scan, *from_remote);
        assert_eq!(other.stats().distributed_hits, 1);
        assert_eq!(other.stats().store_scans, 0);
        assert!(other.local().get(Collection::Goal).await.is_populated());
    }

    #[tokio::test]
    async fn test_empty_collection_is_cached() {
        let h = harness();

        let first = h.coordinator.list_records(Collection::Quiz).await.unwrap();
        let second = h.coordinator.list_records(Collection::Quiz).await.unwrap();

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(h.coordinator.stats().store_scans, 1);
        assert_eq!(h.coordinator.stats().local_hits, 1);
    }

    #[tokio::test]
    async fn test_writes_invalidate_both_tiers() {
        let h = harness();
        h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert!(h.remote.peek("quiz").await.is_some());

        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();

        assert!(!h.coordinator.local().get(Collection::Quiz).await.is_populated());
        assert!(h.remote.peek("quiz").await.is_none());

        let listed = h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert!(listed.contains_email("ann@x.com"));
    }

    #[tokio::test]
    async fn test_delete_is_reflected_in_listing() {
        let h = harness();
        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();
        assert!(h
            .coordinator
            .list_records(Collection::Quiz)
            .await
            .unwrap()
            .contains_email("ann@x.com"));

        let outcome = h
            .coordinator
            .delete_record(Collection::Quiz, "ann@x.com")
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);

        let listed = h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert!(!listed.contains_email("ann@x.com"));

        let again = h
            .coordinator
            .delete_record(Collection::Quiz, "ann@x.com")
            .await
            .unwrap();
        assert_eq!(again, DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_invalidate() {
        let h = harness();
        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();
        h.coordinator.list_records(Collection::Quiz).await.unwrap();
        let before = h.coordinator.stats().invalidations;

        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();

        assert_eq!(h.coordinator.stats().invalidations, before);
        assert!(h.coordinator.local().get(Collection::Quiz).await.is_populated());
    }

    #[tokio::test]
    async fn test_distributed_outage_falls_back_to_store() {
        let h = harness();
        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();
        h.remote.set_available(false);

        let listed = h.coordinator.list_records(Collection::Quiz).await.unwrap();

        assert!(listed.contains_email("ann@x.com"));
        assert!(h.coordinator.stats().tier_failures >= 2);
    }

    #[tokio::test]
    async fn test_failed_remote_invalidation_is_not_served_stale() {
        let h = harness();
        h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert_eq!(h.remote.peek("quiz").await.as_deref(), Some("[]"));

        // Delete against the remote tier fails, leaving "[]" behind
        h.remote.set_available(false);
        h.coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();
        h.remote.set_available(true);
        assert_eq!(h.remote.peek("quiz").await.as_deref(), Some("[]"));

        let listed = h.coordinator.list_records(Collection::Quiz).await.unwrap();
        assert!(listed.contains_email("ann@x.com"));
        assert_eq!(h.coordinator.stats().distributed_hits, 0);

        // The fresh scan repaired the remote copy
        let repaired = h.remote.peek("quiz").await.unwrap();
        assert!(repaired.contains("ann@x.com"));
    }

    #[tokio::test]
    async fn test_malformed_remote_snapshot_is_a_miss() {
        let h = harness();
        h.store
            .set(Collection::Goal, "ann@x.com", &RecordFields::goal("Ann", "MIT", "Boston"))
            .await
            .unwrap();
        // Quiz-shaped records under the goal key
        h.remote
            .set("goal", r#"[{"email":"x@y.co","name":"X"}]"#)
            .await
            .unwrap();

        let listed = h.coordinator.list_records(Collection::Goal).await.unwrap();

        assert!(listed.contains_email("ann@x.com"));
        assert!(!listed.contains_email("x@y.co"));
        assert_eq!(h.coordinator.stats().store_scans, 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let h = harness();
        h.store.set_offline(true);

        assert!(h.coordinator.list_records(Collection::Quiz).await.is_err());
        assert!(h
            .coordinator
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .is_err());
        assert!(!h.coordinator.local().get(Collection::Quiz).await.is_populated());
    }

    #[tokio::test]
    async fn test_bulk_create_dedupes_and_invalidates_once() {
        let h = harness();
        h.coordinator.list_records(Collection::Goal).await.unwrap();
        let before = h.coordinator.stats().invalidations;

        let count = h
            .coordinator
            .bulk_create(
                Collection::Goal,
                vec![
                    ("a@x.com".into(), RecordFields::goal("A", "I", "L")),
                    ("b@x.com".into(), RecordFields::goal("B", "I", "L")),
                    ("a@x.com".into(), RecordFields::goal("A2", "I", "L")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(h.coordinator.stats().invalidations, before + 1);

        let listed = h.coordinator.list_records(Collection::Goal).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed.records()[0].fields.name(), "A2");
    }

    #[tokio::test]
    async fn test_bulk_create_invalidates_after_partial_failure() {
        let coordinator = CacheCoordinator::new(
            Arc::new(FailingWrite {
                inner: MemoryStore::new(),
                email: "b@x.com",
            }),
            Arc::new(MemoryCache::new()),
        );
        coordinator.list_records(Collection::Goal).await.unwrap();
        let before = coordinator.stats().invalidations;

        let result = coordinator
            .bulk_create(
                Collection::Goal,
                vec![
                    ("a@x.com".into(), RecordFields::goal("A", "I", "L")),
                    ("b@x.com".into(), RecordFields::goal("B", "I", "L")),
                    ("c@x.com".into(), RecordFields::goal("C", "I", "L")),
                ],
            )
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable)));
        assert_eq!(coordinator.stats().invalidations, before + 1);

        let listed = coordinator.list_records(Collection::Goal).await.unwrap();
        let emails: Vec<&str> = listed.records().iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, ["a@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn test_hanging_distributed_tier_is_bounded() {
        let coordinator = CacheCoordinator::with_tier_timeout(
            Arc::new(MemoryStore::new()),
            Arc::new(Hanging),
            Duration::from_millis(50),
        );

        let run = async {
            let outcome = coordinator
                .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
                .await
                .unwrap();
            let listed = coordinator.list_records(Collection::Quiz).await.unwrap();
            (outcome, listed)
        };
        let (outcome, listed) = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("tier calls were not bounded");

        assert_eq!(outcome, CreateOutcome::Created);
        assert_eq!(listed.len(), 1);
        assert!(coordinator.stats().tier_failures >= 2);
    }

    #[tokio::test]
    async fn test_publish_racing_another_process_invalidation_is_dropped() {
        let store = MemoryStore::new();
        let remote = MemoryCache::new();
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let slow = Arc::new(CacheCoordinator::with_tier_timeout(
            Arc::new(store.clone()),
            Arc::new(HeldPublish {
                inner: remote.clone(),
                reached: Arc::clone(&reached),
                release: Arc::clone(&release),
            }),
            Duration::from_secs(5),
        ));
        let writer = CacheCoordinator::new(Arc::new(store.clone()), Arc::new(remote.clone()));

        // Slow process scans the empty collection and parks before publishing
        let listing = tokio::spawn({
            let slow = Arc::clone(&slow);
            async move { slow.list_records(Collection::Quiz).await.unwrap() }
        });
        reached.notified().await;

        writer
            .create_record(Collection::Quiz, "ann@x.com", &quiz("Ann"))
            .await
            .unwrap();
        release.notify_one();

        let stale = listing.await.unwrap();
        assert!(stale.is_empty());
        assert_eq!(remote.peek("quiz").await, None);

        let listed = writer.list_records(Collection::Quiz).await.unwrap();
        assert!(listed.contains_email("ann@x.com"));
        assert_eq!(writer.stats().distributed_hits, 0);
    }

    #[tokio::test]
    async fn test_bulk_create_empty_is_noop() {
        let h = harness();
        let count = h
            .coordinator
            .bulk_create(Collection::Goal, Vec::new())
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(h.coordinator.stats().invalidations, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_admit_exactly_one() {
        let h = harness();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let coordinator = Arc::clone(&h.coordinator);
                tokio::spawn(async move {
                    coordinator
                        .create_record(Collection::Quiz, "race@x.com", &quiz(&format!("n{i}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap() == CreateOutcome::Created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_listing_after_write_under_concurrent_readers() {
        let h = harness();

        for round in 0..20 {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let coordinator = Arc::clone(&h.coordinator);
                    tokio::spawn(async move {
                        coordinator.list_records(Collection::Quiz).await.unwrap();
                    })
                })
                .collect();

            let email = format!("user{round}@x.com");
            h.coordinator
                .create_record(Collection::Quiz, &email, &quiz("U"))
                .await
                .unwrap();

            let listed = h.coordinator.list_records(Collection::Quiz).await.unwrap();
            assert!(listed.contains_email(&email), "round {round} lost its write");

            for reader in readers {
                reader.await.unwrap();
            }
        }
    }
}
