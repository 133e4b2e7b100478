//! Backing Store Module
//!
//! Contract for the authoritative dataset the cache sits in front of.

mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use memory::InMemoryRecordStore;

// == Store Error ==
/// Failure reported by the backing store.
///
/// Always surfaced to callers, never read as "absent".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store cannot be reached
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    /// Store did not answer within the configured bound
    #[error("Backing store query timed out after {0:?}")]
    Timeout(Duration),

    /// Store answered with an error
    #[error("Backing store query failed: {0}")]
    Query(String),
}

/// Result type for backing store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Cache Record ==
/// A record the engine can serialize into the cache.
///
/// The engine never looks inside a record beyond its key.
pub trait CacheRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier the record is looked up by.
    fn key(&self) -> i64;
}

// == Record Store ==
/// Point lookups plus a full enumeration used to seed the existence filter.
#[async_trait]
pub trait RecordStore<R: CacheRecord>: Send + Sync {
    /// Returns the record stored under `key`, if any.
    async fn find_by_key(&self, key: i64) -> StoreResult<Option<R>>;

    /// Returns every record in the store.
    async fn enumerate_all(&self) -> StoreResult<Vec<R>>;
}
