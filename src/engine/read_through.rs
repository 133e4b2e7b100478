//! Read-Through Engine
//!
//! The lookup protocols behind each [`Strategy`].
//!
//! The cache backend is a soft dependency: any backend error or timeout is
//! logged and the call carries on against the store, without the cache and
//! without the mutex. Store errors always reach the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{EngineConfig, KeySpace, LookupStats, LookupStatsSnapshot, Strategy};
use crate::backend::{BackendError, BackendResult, CacheBackend};
use crate::error::{LookupError, Result};
use crate::filter::{ExistenceFilter, Membership};
use crate::lock::{DistributedMutex, LockError, LockToken};
use crate::store::{CacheRecord, RecordStore, StoreError};

/// Value stored under a negative key; only its presence matters.
const ABSENT_SENTINEL: &[u8] = b"";

/// What a positive-cache read produced.
enum CacheRead<R> {
    Hit(R),
    Miss,
    /// Backend failed; the call must not rely on the cache any further
    Unavailable,
}

// == Read-Through Engine ==
/// Serves point lookups through the cache, filter and mutex it is given.
///
/// Holds no per-call state and is shared across tasks behind an `Arc`.
pub struct ReadThroughEngine<R: CacheRecord> {
    backend: Arc<dyn CacheBackend>,
    store: Arc<dyn RecordStore<R>>,
    filter: Arc<ExistenceFilter>,
    mutex: DistributedMutex,
    keys: KeySpace,
    config: EngineConfig,
    stats: LookupStats,
}

impl<R: CacheRecord> ReadThroughEngine<R> {
    // == Constructor ==
    /// Wires the engine to its collaborators.
    ///
    /// The filter must already hold the store's key population before
    /// `ExistenceFilter` lookups are served.
    ///
    /// # Errors
    /// `Initialization` if `config` fails validation.
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        store: Arc<dyn RecordStore<R>>,
        filter: Arc<ExistenceFilter>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mutex = DistributedMutex::new(backend.clone(), config.release_mode, config.cache_timeout);

        Ok(Self {
            backend,
            store,
            filter,
            mutex,
            keys: KeySpace::new(config.namespace.clone()),
            config,
            stats: LookupStats::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn filter(&self) -> &ExistenceFilter {
        &self.filter
    }

    pub fn stats(&self) -> LookupStatsSnapshot {
        self.stats.snapshot()
    }

    /// Re-enumerates the store into the existence filter.
    pub async fn rebuild_filter(&self) -> Result<usize> {
        self.filter.rebuild_from(self.store.as_ref()).await
    }

    // == Lookup ==
    /// Looks `key` up with `strategy`. `Ok(None)` means the record does not exist.
    pub async fn lookup(&self, strategy: Strategy, key: i64) -> Result<Option<R>> {
        self.lookup_with_cancel(strategy, key, &CancellationToken::new())
            .await
    }

    /// Like [`lookup`](Self::lookup), but stops waiting with `Cancelled` once
    /// `cancel` fires.
    pub async fn lookup_with_cancel(
        &self,
        strategy: Strategy,
        key: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<R>> {
        debug!(key, %strategy, "lookup");
        match strategy {
            Strategy::Passthrough => self.query_store(key).await,
            Strategy::CacheAside => self.cache_aside(key).await,
            Strategy::NegativeCache => self.negative_cache(key).await,
            Strategy::ExistenceFilter => self.filter_gated(key).await,
            Strategy::Mutex => self.mutex_guarded(key, None, cancel).await,
            Strategy::MutexWait => {
                self.mutex_guarded(key, Some(self.config.lock_wait), cancel)
                    .await
            }
        }
    }

    // == Cache Aside ==
    async fn cache_aside(&self, key: i64) -> Result<Option<R>> {
        let cache_up = match self.read_positive(key).await {
            CacheRead::Hit(record) => return Ok(Some(record)),
            CacheRead::Miss => true,
            CacheRead::Unavailable => false,
        };

        let record = self.query_store(key).await?;
        if let (true, Some(found)) = (cache_up, &record) {
            self.write_positive(key, found).await;
        }
        Ok(record)
    }

    // == Negative Cache ==
    async fn negative_cache(&self, key: i64) -> Result<Option<R>> {
        match self.bounded(self.backend.exists(&self.keys.negative(key))).await {
            Ok(true) => {
                self.stats.record_negative_hit();
                info!(key, "negative cache hit, record known absent");
                return Ok(None);
            }
            Ok(false) => {}
            Err(e) => {
                self.degrade(key, &e);
                return self.query_store(key).await;
            }
        }

        match self.read_positive(key).await {
            CacheRead::Hit(record) => Ok(Some(record)),
            CacheRead::Unavailable => self.query_store(key).await,
            CacheRead::Miss => {
                let record = self.query_store(key).await?;
                match &record {
                    Some(found) => self.write_positive(key, found).await,
                    None => self.write_negative(key).await,
                }
                Ok(record)
            }
        }
    }

    // == Existence Filter ==
    async fn filter_gated(&self, key: i64) -> Result<Option<R>> {
        let cache_up = match self.read_positive(key).await {
            CacheRead::Hit(record) => return Ok(Some(record)),
            CacheRead::Miss => true,
            CacheRead::Unavailable => false,
        };

        if self.filter.contains(key) == Membership::DefinitelyAbsent {
            self.stats.record_filter_rejection();
            info!(key, "existence filter rejected key");
            return Ok(None);
        }

        let record = self.query_store(key).await?;
        match &record {
            Some(found) if cache_up => self.write_positive(key, found).await,
            Some(_) => {}
            None => {
                // Left uncached; bounded by the filter's false-positive rate.
                self.stats.record_filter_false_positive();
                debug!(key, "existence filter false positive");
            }
        }
        Ok(record)
    }

    // == Mutex Guarded ==
    /// Serializes store queries for `key` behind its lease.
    ///
    /// `wait` of `None` makes one acquisition attempt per round; `Some` polls
    /// for up to that long. Each failed round backs off, and after
    /// `max_retries` extra rounds the key is reported as contended.
    async fn mutex_guarded(
        &self,
        key: i64,
        wait: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Option<R>> {
        let lock_key = self.keys.lock(key);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if cancel.is_cancelled() {
                return Err(LookupError::Cancelled(key));
            }

            match self.read_positive(key).await {
                CacheRead::Hit(record) => return Ok(Some(record)),
                CacheRead::Unavailable => return self.query_store(key).await,
                CacheRead::Miss => {}
            }

            let acquired = match wait {
                None => self
                    .mutex
                    .acquire(&lock_key, self.config.lock_lease)
                    .await
                    .map_err(LockError::from),
                Some(wait) => {
                    self.mutex
                        .acquire_within(
                            &lock_key,
                            self.config.lock_lease,
                            wait,
                            self.config.lock_poll_interval,
                            cancel,
                        )
                        .await
                }
            };

            match acquired {
                Ok(Some(token)) => return self.fill_under_lock(key, &lock_key, token).await,
                Ok(None) => {}
                Err(LockError::Cancelled) => return Err(LookupError::Cancelled(key)),
                Err(LockError::Backend(e)) => {
                    self.degrade(key, &e);
                    return self.query_store(key).await;
                }
            }

            self.stats.record_contention();
            if attempts > self.config.max_retries {
                warn!(key, attempts, "key still locked elsewhere, giving up");
                return Err(LookupError::Contended { key, attempts });
            }
            debug!(key, attempts, "key locked elsewhere, backing off");

            tokio::select! {
                _ = cancel.cancelled() => return Err(LookupError::Cancelled(key)),
                _ = tokio::time::sleep(self.config.retry_backoff) => {}
            }
        }
    }

    /// Runs the double-checked fill and releases the lease whatever it returns.
    ///
    /// If this future is dropped mid-fill the lease TTL releases the key.
    async fn fill_under_lock(&self, key: i64, lock_key: &str, token: LockToken) -> Result<Option<R>> {
        self.stats.record_lock_acquired();
        info!(key, "lock acquired");

        let result = self.double_checked_fill(key).await;

        if let Err(e) = self.mutex.release(lock_key, &token).await {
            warn!(key, error = %e, "lock release failed, lease will expire on its own");
        }
        result
    }

    async fn double_checked_fill(&self, key: i64) -> Result<Option<R>> {
        let cache_up = match self.read_positive(key).await {
            CacheRead::Hit(record) => {
                debug!(key, "filled by previous holder");
                return Ok(Some(record));
            }
            CacheRead::Miss => true,
            CacheRead::Unavailable => false,
        };

        let record = self.query_store(key).await?;
        if let (true, Some(found)) = (cache_up, &record) {
            self.write_positive(key, found).await;
        }
        Ok(record)
    }

    // == Store Access ==
    async fn query_store(&self, key: i64) -> Result<Option<R>> {
        self.stats.record_store_query();
        info!(key, "querying backing store");

        let timeout = self.config.store_timeout;
        tokio::time::timeout(timeout, self.store.find_by_key(key))
            .await
            .unwrap_or(Err(StoreError::Timeout(timeout)))
            .map_err(|e| {
                warn!(key, error = %e, "backing store query failed");
                LookupError::Store(e)
            })
    }

    // == Cache Access ==
    async fn read_positive(&self, key: i64) -> CacheRead<R> {
        let cache_key = self.keys.positive(key);
        match self.bounded(self.backend.get(&cache_key)).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(record) => {
                    self.stats.record_hit();
                    debug!(key, "cache hit");
                    CacheRead::Hit(record)
                }
                Err(e) => {
                    warn!(key, error = %e, "dropping undecodable cache entry");
                    self.stats.record_miss();
                    if let Err(e) = self.bounded(self.backend.delete(&cache_key)).await {
                        warn!(key, error = %e, "failed to drop undecodable cache entry");
                    }
                    CacheRead::Miss
                }
            },
            Ok(None) => {
                self.stats.record_miss();
                debug!(key, "cache miss");
                CacheRead::Miss
            }
            Err(e) => {
                self.degrade(key, &e);
                CacheRead::Unavailable
            }
        }
    }

    /// Caches `record`, displacing any negative entry for the key.
    async fn write_positive(&self, key: i64, record: &R) {
        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "record not serializable, skipping cache");
                return;
            }
        };

        let written = self
            .replace_entry(
                &self.keys.negative(key),
                &self.keys.positive(key),
                bytes,
                self.config.positive_ttl,
            )
            .await;
        match written {
            Ok(()) => debug!(key, "cache populated"),
            Err(e) => {
                self.stats.record_degraded();
                warn!(key, error = %e, "failed to populate cache");
            }
        }
    }

    /// Records a confirmed absence, displacing any positive entry for the key.
    async fn write_negative(&self, key: i64) {
        let written = self
            .replace_entry(
                &self.keys.positive(key),
                &self.keys.negative(key),
                ABSENT_SENTINEL.to_vec(),
                self.config.negative_ttl,
            )
            .await;
        match written {
            Ok(()) => {
                self.stats.record_negative_write();
                info!(key, ttl = ?self.config.negative_ttl, "absence cached");
            }
            Err(e) => {
                self.stats.record_degraded();
                warn!(key, error = %e, "failed to cache absence");
            }
        }
    }

    /// Swaps `stale` for `fresh` atomically; the last writer wins.
    async fn replace_entry(
        &self,
        stale: &str,
        fresh: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> BackendResult<()> {
        self.bounded(self.backend.replace_with_ttl(stale, fresh, value, ttl))
            .await
    }

    async fn bounded<T>(&self, op: impl Future<Output = BackendResult<T>>) -> BackendResult<T> {
        tokio::time::timeout(self.config.cache_timeout, op)
            .await
            .unwrap_or(Err(BackendError::Timeout(self.config.cache_timeout)))
    }

    fn degrade(&self, key: i64, error: &BackendError) {
        self.stats.record_degraded();
        warn!(key, error = %error, "cache backend unavailable, going straight to store");
    }
}
