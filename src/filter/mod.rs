//! Existence Filter Module
//!
//! A bloom filter over every key in the backing store. It answers
//! "definitely absent" or "possibly present" and is only trusted for absence.
//!
//! Entries are never removed. A key deleted from the store keeps reporting
//! `PossiblyPresent` until [`ExistenceFilter::rebuild_from`] runs, which costs
//! one authoritative store query per lookup and nothing more.


use std::sync::atomic::{AtomicUsize, Ordering};

use bloomfilter::Bloom;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::{LookupError, Result};
use crate::store::{CacheRecord, RecordStore};

/// Answer from [`ExistenceFilter::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The key was never added; the store does not need to be asked
    DefinitelyAbsent,
    /// The key was added, or this is a false positive
    PossiblyPresent,
}

/// Process-wide bloom filter keyed by record id.
pub struct ExistenceFilter {
    bloom: RwLock<Bloom<i64>>,
    expected_items: usize,
    false_positive_rate: f64,
    inserted: AtomicUsize,
}

impl ExistenceFilter {
    /// Creates an empty filter sized for `expected_items` at `false_positive_rate`.
    ///
    /// # Errors
    /// `Initialization` when `expected_items` is zero or the rate is outside (0, 1).
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
        let bloom = new_bloom(expected_items, false_positive_rate)?;
        Ok(Self {
            bloom: RwLock::new(bloom),
            expected_items,
            false_positive_rate,
            inserted: AtomicUsize::new(0),
        })
    }

    /// Builds a filter holding every key in `keys`.
    ///
    /// The filter is sized for at least as many keys as it receives, so an
    /// undersized `expected_items` never pushes the error rate past target.
    pub fn build(
        keys: impl IntoIterator<Item = i64>,
        expected_items: usize,
        false_positive_rate: f64,
    ) -> Result<Self> {
        let keys: Vec<i64> = keys.into_iter().collect();
        let capacity = sized_for(keys.len(), expected_items);
        let filter = Self::new(capacity, false_positive_rate)?;
        for key in keys {
            filter.add(key);
        }
        Ok(filter)
    }

    /// Builds a filter from a full enumeration of `store`.
    pub async fn from_store<R, S>(
        store: &S,
        expected_items: usize,
        false_positive_rate: f64,
    ) -> Result<Self>
    where
        R: CacheRecord,
        S: RecordStore<R> + ?Sized,
    {
        let records = store.enumerate_all().await?;
        let filter = Self::build(
            records.iter().map(|record| record.key()),
            expected_items,
            false_positive_rate,
        )?;
        info!(keys = filter.len(), "existence filter built");
        Ok(filter)
    }

    /// Replaces the filter contents with a fresh enumeration of `store`.
    ///
    /// Lookups keep seeing the old contents until the swap. Returns the
    /// number of keys in the new filter.
    pub async fn rebuild_from<R, S>(&self, store: &S) -> Result<usize>
    where
        R: CacheRecord,
        S: RecordStore<R> + ?Sized,
    {
        let records = store.enumerate_all().await?;
        let capacity = sized_for(records.len(), self.expected_items);
        let mut fresh = new_bloom(capacity, self.false_positive_rate)?;
        for record in &records {
            fresh.set(&record.key());
        }

        *self.bloom.write() = fresh;
        self.inserted.store(records.len(), Ordering::SeqCst);
        info!(keys = records.len(), "existence filter rebuilt");
        Ok(records.len())
    }

    pub fn contains(&self, key: i64) -> Membership {
        if self.bloom.read().check(&key) {
            Membership::PossiblyPresent
        } else {
            Membership::DefinitelyAbsent
        }
    }

    /// Adds `key`. Safe to call while lookups are running.
    pub fn add(&self, key: i64) {
        self.bloom.write().set(&key);
        self.inserted.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of keys added since the last build (duplicates included).
    pub fn len(&self) -> usize {
        self.inserted.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn expected_items(&self) -> usize {
        self.expected_items
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }
}

fn new_bloom(expected_items: usize, false_positive_rate: f64) -> Result<Bloom<i64>> {
    if expected_items == 0 {
        return Err(LookupError::Initialization(
            "filter expected item count must be positive".to_string(),
        ));
    }
    if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
        return Err(LookupError::Initialization(format!(
            "filter false-positive rate {} is outside (0, 1)",
            false_positive_rate
        )));
    }
    Bloom::new_for_fp_rate(expected_items, false_positive_rate)
        .map_err(|e| LookupError::Initialization(e.to_string()))
}

fn sized_for(actual: usize, expected_items: usize) -> usize {
    if actual > expected_items {
        warn!(
            actual,
            expected_items, "more keys than the filter was configured for, growing it"
        );
    }
    actual.max(expected_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;
    use crate::store::InMemoryRecordStore;

    #[test]
    fn test_built_keys_are_possibly_present() {
        let filter = ExistenceFilter::build([1, 3, 4], 1000, 0.01).unwrap();

        assert_eq!(filter.contains(1), Membership::PossiblyPresent);
        assert_eq!(filter.contains(3), Membership::PossiblyPresent);
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let filter = ExistenceFilter::new(1000, 0.01).unwrap();

        assert!(filter.is_empty());
        for key in -50..50 {
            assert_eq!(filter.contains(key), Membership::DefinitelyAbsent);
        }
    }

    #[test]
    fn test_add_after_build() {
        let filter = ExistenceFilter::new(1000, 0.01).unwrap();
        filter.add(99);

        assert_eq!(filter.contains(99), Membership::PossiblyPresent);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            ExistenceFilter::new(0, 0.01),
            Err(LookupError::Initialization(_))
        ));
        assert!(matches!(
            ExistenceFilter::new(1000, 0.0),
            Err(LookupError::Initialization(_))
        ));
        assert!(matches!(
            ExistenceFilter::new(1000, 1.5),
            Err(LookupError::Initialization(_))
        ));
    }

    #[test]
    fn test_build_grows_past_expected_items() {
        let filter = ExistenceFilter::build(0..500, 10, 0.01).unwrap();

        assert!((0..500).all(|key| filter.contains(key) == Membership::PossiblyPresent));
    }

    #[tokio::test]
    async fn test_from_store_enumerates_all_keys() {
        let store = InMemoryRecordStore::new(Product::demo_catalog());

        let filter = ExistenceFilter::from_store(&store, 1000, 0.01).await.unwrap();

        for product in Product::demo_catalog() {
            assert_eq!(filter.contains(product.id), Membership::PossiblyPresent);
        }
        assert_eq!(store.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_drops_deleted_keys() {
        let store = InMemoryRecordStore::new((1..=200).map(|id| Product::new(id, "item", 1.0, 1)));
        let filter = ExistenceFilter::from_store(&store, 1000, 0.01).await.unwrap();

        for id in 101..=200 {
            store.remove(id);
        }
        let keys = filter.rebuild_from(&store).await.unwrap();

        assert_eq!(keys, 100);
        assert_eq!(filter.len(), 100);
        assert!((1..=100).all(|id| filter.contains(id) == Membership::PossiblyPresent));
        let still_reported = (101..=200)
            .filter(|id| filter.contains(*id) == Membership::PossiblyPresent)
            .count();
        assert!(still_reported < 10, "{} deleted keys still reported", still_reported);
    }

    #[tokio::test]
    async fn test_from_store_propagates_store_failure() {
        let store = InMemoryRecordStore::new(Product::demo_catalog());
        store.set_available(false);

        let result = ExistenceFilter::from_store(&store, 1000, 0.01).await;
        assert!(matches!(result, Err(LookupError::Store(_))));
    }
}
