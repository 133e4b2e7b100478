//! Memory Backend Module
//!
//! In-process TTL key/value store implementing [`CacheBackend`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BackendError, BackendResult, BackendStats, CacheBackend, CacheEntry};

// == Memory Backend ==
/// HashMap storage with lazy TTL expiry on access.
///
/// Every operation takes the map lock once, so the compare-and-set primitives
/// are atomic. The availability switch lets callers simulate an outage.
#[derive(Debug)]
pub struct MemoryBackend {
    /// Key-value storage
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Read statistics
    stats: Mutex<BackendStats>,
    /// When false every operation fails with `Unavailable`
    available: AtomicBool,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(BackendStats::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggles simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> BackendResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable(
                "in-memory backend switched off".to_string(),
            ))
        }
    }

    // == Live Lookup ==
    /// Returns the live entry under `key`, dropping it first if it expired.
    fn live<'a>(
        &self,
        entries: &'a mut HashMap<String, CacheEntry>,
        key: &str,
    ) -> Option<&'a CacheEntry> {
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
            self.stats.lock().record_expirations(1);
        }
        entries.get(key)
    }

    // == Remaining TTL ==
    /// Returns the remaining TTL of a live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let mut entries = self.entries.lock();
        self.live(&mut entries, key)
            .and_then(CacheEntry::ttl_remaining)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();

        let mut stats = self.stats.lock();
        stats.record_expirations(removed);
        stats.set_total_entries(entries.len());
        removed
    }

    // == Stats ==
    /// Returns current backend statistics.
    pub fn stats(&self) -> BackendStats {
        let total = self.entries.lock().len();
        let mut stats = self.stats.lock().clone();
        stats.set_total_entries(total);
        stats
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        let value = self.live(&mut entries, key).map(|entry| entry.value.clone());

        let mut stats = self.stats.lock();
        if value.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> BackendResult<()> {
        self.ensure_available()?;
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry::new(value, Some(ttl)));
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> BackendResult<bool> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        if self.live(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), CacheEntry::new(value, Some(ttl)));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> BackendResult<bool> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        let was_live = self.live(&mut entries, key).is_some();
        entries.remove(key);
        Ok(was_live)
    }

    async fn exists(&self, key: &str) -> BackendResult<bool> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        Ok(self.live(&mut entries, key).is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected: &[u8]) -> BackendResult<bool> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        let matches = self
            .live(&mut entries, key)
            .is_some_and(|entry| entry.value == expected);
        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn replace_with_ttl(
        &self,
        stale: &str,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> BackendResult<()> {
        self.ensure_available()?;
        let mut entries = self.entries.lock();
        entries.remove(stale);
        entries.insert(key.to_string(), CacheEntry::new(value, Some(ttl)));
        Ok(())
    }
}
