//! Cache Backend Module
//!
//! Shared key/value store with per-entry TTL. The engine keeps positive
//! entries, negative entries and lock leases here.

mod entry;
mod memory;
mod stats;


use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryBackend;
pub use stats::BackendStats;

// == Backend Error ==
/// Failure talking to the cache backend.
///
/// Lookups never surface this to callers; they degrade to a direct store query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend cannot be reached
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer within the configured bound
    #[error("Cache backend timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for cache backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// == Cache Backend ==
/// Primitives the engine needs from a shared TTL key/value store.
///
/// Implementations must make `set_if_absent_with_ttl`, `delete_if_equals`
/// and `replace_with_ttl` atomic with respect to every other operation on
/// the keys they touch.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the live value stored under `key`.
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value and TTL.
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BackendResult<()>;

    /// Stores `value` only when no live entry exists. Returns whether it was stored.
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> BackendResult<bool>;

    /// Removes `key`. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> BackendResult<bool>;

    /// Returns whether a live entry exists under `key`.
    async fn exists(&self, key: &str) -> BackendResult<bool>;

    /// Removes `key` only if its live value equals `expected`.
    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> BackendResult<bool>;

    /// Removes `stale` and stores `value` under `key` in one step.
    ///
    /// No reader observes both keys live. A Redis backend runs this as a
    /// `MULTI`/`EXEC` pair of `DEL` and `SET PX`.
    async fn replace_with_ttl(
        &self,
        stale: &str,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> BackendResult<()>;
}
