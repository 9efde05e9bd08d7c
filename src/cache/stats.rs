//! Cache Statistics Module
//!
//! Tracks which tier served each listing, plus tier failures and invalidations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time copy of the tier counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Listings served from the process-local tier
    pub local_hits: u64,
    /// Listings served from the distributed tier
    pub distributed_hits: u64,
    /// Listings that fell through to a full durable-store scan
    pub store_scans: u64,
    /// Distributed tier calls that failed or timed out
    pub tier_failures: u64,
    /// Collection invalidations performed
    pub invalidations: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Fraction of listings served without a scan, or 0.0 if none were served.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.distributed_hits;
        let total = hits + self.store_scans;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by every request.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    local_hits: AtomicU64,
    distributed_hits: AtomicU64,
    store_scans: AtomicU64,
    tier_failures: AtomicU64,
    invalidations: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_distributed_hit(&self) {
        self.distributed_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan(&self) {
        self.store_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tier_failure(&self) {
        self.tier_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            distributed_hits: self.distributed_hits.load(Ordering::Relaxed),
            store_scans: self.store_scans.load(Ordering::Relaxed),
            tier_failures: self.tier_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}
