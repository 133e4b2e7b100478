//! Property-Based Tests for the read-through engine
//!
//! Every strategy must agree with the backing store, whatever the key set.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use tokio_test::block_on;

use crate::backend::MemoryBackend;
use crate::engine::{EngineConfig, ReadThroughEngine, Strategy};
use crate::filter::ExistenceFilter;
use crate::models::Product;
use crate::store::{InMemoryRecordStore, RecordStore};

fn build_engine(present: &BTreeSet<i64>) -> (ReadThroughEngine<Product>, Arc<InMemoryRecordStore<Product>>) {
    let store = Arc::new(InMemoryRecordStore::new(
        present
            .iter()
            .map(|id| Product::new(*id, format!("product-{}", id), *id as f64 / 10.0, 1)),
    ));
    let filter = block_on(ExistenceFilter::from_store(store.as_ref(), 1000, 0.01)).unwrap();
    let engine = ReadThroughEngine::<Product>::new(
        Arc::new(MemoryBackend::new()),
        store.clone(),
        Arc::new(filter),
        EngineConfig::default(),
    )
    .unwrap();
    (engine, store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Present keys resolve to the stored record and absent keys to None,
    // for every strategy and across repeated (cached) lookups.
    #[test]
    fn prop_every_strategy_matches_store(
        present in prop::collection::btree_set(-500i64..500, 0..60),
        queries in prop::collection::vec(-500i64..500, 1..40),
    ) {
        let (engine, store) = build_engine(&present);

        for key in &queries {
            let expected = block_on(store.find_by_key(*key)).unwrap();
            for strategy in Strategy::ALL {
                for _ in 0..2 {
                    let got = block_on(engine.lookup(strategy, *key)).unwrap();
                    prop_assert_eq!(&got, &expected, "strategy {} key {}", strategy, key);
                }
            }
        }
    }

    // Once a present key is cached, cache-backed strategies stop querying the store.
    #[test]
    fn prop_cached_keys_need_no_store_query(
        present in prop::collection::btree_set(0i64..200, 1..30),
    ) {
        let (engine, store) = build_engine(&present);

        for key in &present {
            block_on(engine.lookup(Strategy::CacheAside, *key)).unwrap();
        }
        let after_warmup = store.lookup_count();

        for key in &present {
            for strategy in [
                Strategy::CacheAside,
                Strategy::NegativeCache,
                Strategy::ExistenceFilter,
                Strategy::Mutex,
                Strategy::MutexWait,
            ] {
                block_on(engine.lookup(strategy, *key)).unwrap();
            }
        }

        prop_assert_eq!(store.lookup_count(), after_warmup);
    }
}
