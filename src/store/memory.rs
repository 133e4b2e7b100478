//! In-memory record store with simulated query latency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{CacheRecord, RecordStore, StoreError, StoreResult};

/// Record table standing in for the relational store.
///
/// Counts every point lookup so callers can see how much traffic reached it.
#[derive(Debug)]
pub struct InMemoryRecordStore<R> {
    records: RwLock<BTreeMap<i64, R>>,
    latency: Duration,
    lookups: AtomicU64,
    available: AtomicBool,
}

impl<R: CacheRecord> InMemoryRecordStore<R> {
    pub fn new(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.key(), r)).collect()),
            latency: Duration::ZERO,
            lookups: AtomicU64::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Delays every query by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&self, record: R) {
        self.records.write().insert(record.key(), record);
    }

    pub fn remove(&self, key: i64) -> Option<R> {
        self.records.write().remove(&key)
    }

    /// Number of `find_by_key` calls made so far.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Toggles simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn round_trip(&self) -> StoreResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("record store switched off".to_string()))
        }
    }
}

#[async_trait]
impl<R: CacheRecord> RecordStore<R> for InMemoryRecordStore<R> {
    async fn find_by_key(&self, key: i64) -> StoreResult<Option<R>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await?;
        debug!(key, "record store lookup");
        Ok(self.records.read().get(&key).cloned())
    }

    async fn enumerate_all(&self) -> StoreResult<Vec<R>> {
        self.round_trip().await?;
        Ok(self.records.read().values().cloned().collect())
    }
}
