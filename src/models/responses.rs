//! Response DTOs for the registry API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Confirmation body for create and delete operations.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn created() -> Self {
        Self::new("user added.")
    }

    pub fn deleted() -> Self {
        Self::new("user deleted")
    }
}

/// Response body for POST /goal/uploadJSON
#[derive(Debug, Clone, Serialize)]
pub struct BulkResponse {
    pub message: String,
    /// Number of distinct emails written. Entries repeating an email in the
    /// same upload count once, so this can be lower than the number of
    /// entries sent.
    pub count: usize,
}

impl BulkResponse {
    pub fn new(count: usize) -> Self {
        Self {
            message: format!("users added successfully. count={}", count),
            count,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Listings served from the process-local tier
    pub local_hits: u64,
    /// Listings served from the distributed tier
    pub distributed_hits: u64,
    /// Listings that required a full durable-store scan
    pub store_scans: u64,
    /// Distributed tier calls that failed or timed out
    pub tier_failures: u64,
    /// Collection invalidations performed
    pub invalidations: u64,
    /// Fraction of listings served without a scan
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            local_hits: stats.local_hits,
            distributed_hits: stats.distributed_hits,
            store_scans: stats.store_scans,
            tier_failures: stats.tier_failures,
            invalidations: stats.invalidations,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
