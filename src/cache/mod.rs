//! Cache Module
//!
//! Tiered snapshot caching: process-local slots, a distributed cache, and the
//! coordinator that keeps them coherent with the durable store.

mod coordinator;
mod distributed;
mod local;
mod stats;


// Re-export public types
pub use coordinator::{CacheCoordinator, CreateOutcome, DeleteOutcome, DEFAULT_TIER_TIMEOUT};
pub use distributed::{DistributedCache, MemoryCache, RedisCache};
pub use local::{CacheState, LocalCache};
pub use stats::{CacheStats, StatsRecorder};
