//! API Handlers
//!
//! HTTP request handlers for each product lookup endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::backend::MemoryBackend;
use crate::config::Config;
use crate::engine::{ReadThroughEngine, Strategy};
use crate::error::{LookupError, Result};
use crate::filter::ExistenceFilter;
use crate::models::{FilterSummary, HealthResponse, Product, RebuildResponse, StatsResponse};
use crate::store::InMemoryRecordStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lookup engine serving every strategy
    pub engine: Arc<ReadThroughEngine<Product>>,
    /// Cache backend, kept concrete for stats and the cleanup task
    pub backend: Arc<MemoryBackend>,
    /// Fired on shutdown so waiting lookups stop early
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(engine: Arc<ReadThroughEngine<Product>>, backend: Arc<MemoryBackend>) -> Self {
        Self {
            engine,
            backend,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Seeds the demo catalog, builds the existence filter from it and wires
    /// the engine to an in-process cache backend.
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let store = Arc::new(
            InMemoryRecordStore::new(Product::demo_catalog())
                .with_latency(Duration::from_millis(config.store_latency_ms)),
        );
        let filter = ExistenceFilter::from_store(
            store.as_ref(),
            config.filter_expected_items,
            config.filter_fp_rate,
        )
        .await?;
        let backend = Arc::new(MemoryBackend::new());

        let engine = ReadThroughEngine::<Product>::new(
            backend.clone(),
            store,
            Arc::new(filter),
            config.engine_config(),
        )?;
        info!(namespace = %engine.config().namespace, "lookup engine ready");

        Ok(Self::new(Arc::new(engine), backend))
    }

    fn filter_summary(&self) -> FilterSummary {
        let filter = self.engine.filter();
        FilterSummary {
            inserted_keys: filter.len(),
            expected_items: filter.expected_items(),
            false_positive_rate: filter.false_positive_rate(),
        }
    }

    async fn lookup(&self, strategy: Strategy, id: i64) -> Result<Json<Product>> {
        self.engine
            .lookup_with_cancel(strategy, id, &self.shutdown)
            .await?
            .map(Json)
            .ok_or(LookupError::NotFound(id))
    }
}

/// Handler for GET /api/products/:id
///
/// Queries the store directly on every call.
pub async fn passthrough_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>> {
    state.lookup(Strategy::Passthrough, id).await
}

/// Handler for GET /api/products/:strategy/:id
pub async fn strategy_handler(
    State(state): State<AppState>,
    Path((strategy, id)): Path<(String, i64)>,
) -> Result<Json<Product>> {
    let strategy: Strategy = strategy.parse()?;
    state.lookup(strategy, id).await
}

/// Handler for POST /api/admin/bloom-filter/rebuild
pub async fn rebuild_filter_handler(State(state): State<AppState>) -> Result<Json<RebuildResponse>> {
    let keys = state.engine.rebuild_filter().await?;
    Ok(Json(RebuildResponse::new(keys)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.engine.stats(),
        state.backend.stats(),
        state.filter_summary(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state() -> AppState {
        let config = Config {
            store_latency_ms: 0,
            ..Config::default()
        };
        AppState::bootstrap(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_passthrough_handler() {
        let state = test_state().await;

        let response = passthrough_handler(State(state), Path(1)).await.unwrap();
        assert_eq!(response.id, 1);
        assert_eq!(response.name, "iPhone 15");
    }

    #[tokio::test]
    async fn test_strategy_handler_missing_key() {
        let state = test_state().await;

        let result = strategy_handler(State(state), Path(("null-cache".to_string(), 2))).await;
        assert!(matches!(result, Err(LookupError::NotFound(2))));
    }

    #[tokio::test]
    async fn test_strategy_handler_unknown_strategy() {
        let state = test_state().await;

        let result = strategy_handler(State(state), Path(("redisson".to_string(), 1))).await;
        assert!(matches!(result, Err(LookupError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_strategy_handler_fills_cache() {
        let state = test_state().await;

        for _ in 0..3 {
            let response = strategy_handler(State(state.clone()), Path(("cache".to_string(), 3)))
                .await
                .unwrap();
            assert_eq!(response.id, 3);
        }

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.lookups.store_queries, 1);
        assert_eq!(stats.lookups.cache_hits, 2);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_waiting_lookup() {
        let state = test_state().await;
        state.shutdown.cancel();

        let result = strategy_handler(State(state), Path(("wait-lock".to_string(), 1))).await;
        assert!(matches!(result, Err(LookupError::Cancelled(1))));
    }

    #[tokio::test]
    async fn test_rebuild_filter_handler() {
        let state = test_state().await;

        let response = rebuild_filter_handler(State(state)).await.unwrap();
        assert_eq!(response.keys, Product::demo_catalog().len());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
