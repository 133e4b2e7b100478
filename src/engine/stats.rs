//! Lookup Statistics Module
//!
//! Lock-free counters shared by every concurrent lookup.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Lookup Stats ==
/// Counts protocol decisions across all strategies.
#[derive(Debug, Default)]
pub struct LookupStats {
    store_queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    negative_hits: AtomicU64,
    negative_writes: AtomicU64,
    filter_rejections: AtomicU64,
    filter_false_positives: AtomicU64,
    lock_acquisitions: AtomicU64,
    lock_contentions: AtomicU64,
    degraded_calls: AtomicU64,
}

/// Point-in-time copy of [`LookupStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupStatsSnapshot {
    pub store_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub negative_hits: u64,
    pub negative_writes: u64,
    pub filter_rejections: u64,
    pub filter_false_positives: u64,
    pub lock_acquisitions: u64,
    pub lock_contentions: u64,
    pub degraded_calls: u64,
}

impl LookupStatsSnapshot {
    /// Positive-cache hits / (hits + misses).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl LookupStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_store_query(&self) {
        bump(&self.store_queries);
    }

    pub fn record_hit(&self) {
        bump(&self.cache_hits);
    }

    pub fn record_miss(&self) {
        bump(&self.cache_misses);
    }

    pub fn record_negative_hit(&self) {
        bump(&self.negative_hits);
    }

    pub fn record_negative_write(&self) {
        bump(&self.negative_writes);
    }

    pub fn record_filter_rejection(&self) {
        bump(&self.filter_rejections);
    }

    pub fn record_filter_false_positive(&self) {
        bump(&self.filter_false_positives);
    }

    pub fn record_lock_acquired(&self) {
        bump(&self.lock_acquisitions);
    }

    pub fn record_contention(&self) {
        bump(&self.lock_contentions);
    }

    pub fn record_degraded(&self) {
        bump(&self.degraded_calls);
    }

    pub fn snapshot(&self) -> LookupStatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        LookupStatsSnapshot {
            store_queries: load(&self.store_queries),
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            negative_hits: load(&self.negative_hits),
            negative_writes: load(&self.negative_writes),
            filter_rejections: load(&self.filter_rejections),
            filter_false_positives: load(&self.filter_false_positives),
            lock_acquisitions: load(&self.lock_acquisitions),
            lock_contentions: load(&self.lock_contentions),
            degraded_calls: load(&self.degraded_calls),
        }
    }
}
