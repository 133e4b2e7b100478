//! Response DTOs for the product API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::backend::BackendStats;
use crate::engine::LookupStatsSnapshot;

/// Existence filter parameters and fill level.
#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    /// Keys added since the last build
    pub inserted_keys: usize,
    /// Capacity the filter was sized for
    pub expected_items: usize,
    /// Target false-positive rate
    pub false_positive_rate: f64,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Engine-level lookup counters
    pub lookups: LookupStatsSnapshot,
    /// Positive-cache hits / (hits + misses) as seen by the engine
    pub lookup_hit_rate: f64,
    /// Backend read counters
    pub backend: BackendStats,
    /// Backend hits / (hits + misses)
    pub backend_hit_rate: f64,
    /// Existence filter state
    pub filter: FilterSummary,
}

impl StatsResponse {
    pub fn new(lookups: LookupStatsSnapshot, backend: BackendStats, filter: FilterSummary) -> Self {
        Self {
            lookup_hit_rate: lookups.hit_rate(),
            backend_hit_rate: backend.hit_rate(),
            lookups,
            backend,
            filter,
        }
    }
}

/// Response body for POST /api/admin/bloom-filter/rebuild
#[derive(Debug, Clone, Serialize)]
pub struct RebuildResponse {
    /// Success message
    pub message: String,
    /// Number of keys loaded into the new filter
    pub keys: usize,
}

impl RebuildResponse {
    pub fn new(keys: usize) -> Self {
        Self {
            message: format!("Existence filter rebuilt with {} keys", keys),
            keys,
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
