//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::lock::ReleaseMode;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Prefix shared by every cache key
    pub namespace: String,
    /// Positive entry TTL in seconds
    pub positive_ttl_secs: u64,
    /// Negative entry TTL in seconds
    pub negative_ttl_secs: u64,
    /// Mutex lease in seconds
    pub lock_lease_secs: u64,
    /// Mutex wait per attempt for the waiting strategy, in milliseconds
    pub lock_wait_ms: u64,
    /// Mutex poll interval in milliseconds
    pub lock_poll_ms: u64,
    /// Pause between contended attempts in milliseconds
    pub retry_backoff_ms: u64,
    /// Extra attempts before a contended key is given up on
    pub max_retries: u32,
    /// Existence filter sizing
    pub filter_expected_items: usize,
    /// Existence filter target false-positive rate
    pub filter_fp_rate: f64,
    /// Backing store query bound in milliseconds
    pub store_timeout_ms: u64,
    /// Cache backend round-trip bound in milliseconds
    pub cache_timeout_ms: u64,
    /// Simulated latency of the demo record store in milliseconds
    pub store_latency_ms: u64,
    /// How mutex leases are released
    pub release_mode: ReleaseMode,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` (default: 3000)
    /// - `CLEANUP_INTERVAL` seconds (default: 1)
    /// - `CACHE_NAMESPACE` (default: product)
    /// - `POSITIVE_TTL_SECS` (default: 1800)
    /// - `NEGATIVE_TTL_SECS` (default: 300)
    /// - `LOCK_LEASE_SECS` (default: 10)
    /// - `LOCK_WAIT_MS` (default: 10000)
    /// - `LOCK_POLL_MS` (default: 25)
    /// - `RETRY_BACKOFF_MS` (default: 100)
    /// - `MAX_RETRIES` (default: 50)
    /// - `FILTER_EXPECTED_ITEMS` (default: 1000)
    /// - `FILTER_FP_RATE` (default: 0.01)
    /// - `STORE_TIMEOUT_MS` (default: 5000)
    /// - `CACHE_TIMEOUT_MS` (default: 1000)
    /// - `STORE_LATENCY_MS` (default: 50)
    /// - `RELEASE_MODE` `token` or `unconditional` (default: token)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            namespace: env_or("CACHE_NAMESPACE", defaults.namespace),
            positive_ttl_secs: env_or("POSITIVE_TTL_SECS", defaults.positive_ttl_secs),
            negative_ttl_secs: env_or("NEGATIVE_TTL_SECS", defaults.negative_ttl_secs),
            lock_lease_secs: env_or("LOCK_LEASE_SECS", defaults.lock_lease_secs),
            lock_wait_ms: env_or("LOCK_WAIT_MS", defaults.lock_wait_ms),
            lock_poll_ms: env_or("LOCK_POLL_MS", defaults.lock_poll_ms),
            retry_backoff_ms: env_or("RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            max_retries: env_or("MAX_RETRIES", defaults.max_retries),
            filter_expected_items: env_or("FILTER_EXPECTED_ITEMS", defaults.filter_expected_items),
            filter_fp_rate: env_or("FILTER_FP_RATE", defaults.filter_fp_rate),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            cache_timeout_ms: env_or("CACHE_TIMEOUT_MS", defaults.cache_timeout_ms),
            store_latency_ms: env_or("STORE_LATENCY_MS", defaults.store_latency_ms),
            release_mode: env_or("RELEASE_MODE", defaults.release_mode),
        }
    }

    /// Projects the settings the engine consumes.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_namespace(self.namespace.clone())
            .with_ttls(
                Duration::from_secs(self.positive_ttl_secs),
                Duration::from_secs(self.negative_ttl_secs),
            )
            .with_lock(
                Duration::from_secs(self.lock_lease_secs),
                Duration::from_millis(self.lock_wait_ms),
                Duration::from_millis(self.lock_poll_ms),
            )
            .with_retry(Duration::from_millis(self.retry_backoff_ms), self.max_retries)
            .with_timeouts(
                Duration::from_millis(self.store_timeout_ms),
                Duration::from_millis(self.cache_timeout_ms),
            )
            .with_release_mode(self.release_mode)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 1,
            namespace: "product".to_string(),
            positive_ttl_secs: 30 * 60,
            negative_ttl_secs: 5 * 60,
            lock_lease_secs: 10,
            lock_wait_ms: 10_000,
            lock_poll_ms: 25,
            retry_backoff_ms: 100,
            max_retries: 50,
            filter_expected_items: 1000,
            filter_fp_rate: 0.01,
            store_timeout_ms: 5_000,
            cache_timeout_ms: 1_000,
            store_latency_ms: 50,
            release_mode: ReleaseMode::TokenChecked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.positive_ttl_secs, 1800);
        assert_eq!(config.negative_ttl_secs, 300);
        assert_eq!(config.filter_expected_items, 1000);
        assert_eq!(config.filter_fp_rate, 0.01);
    }

    #[test]
    fn test_engine_config_matches_engine_defaults() {
        let projected = Config::default().engine_config();
        let defaults = EngineConfig::default();

        assert_eq!(projected.namespace, defaults.namespace);
        assert_eq!(projected.positive_ttl, defaults.positive_ttl);
        assert_eq!(projected.negative_ttl, defaults.negative_ttl);
        assert_eq!(projected.lock_lease, defaults.lock_lease);
        assert_eq!(projected.lock_wait, defaults.lock_wait);
        assert_eq!(projected.retry_backoff, defaults.retry_backoff);
        assert_eq!(projected.max_retries, defaults.max_retries);
        assert_eq!(projected.release_mode, defaults.release_mode);
        assert!(projected.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("NEGATIVE_TTL_SECS");
        env::remove_var("RELEASE_MODE");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.negative_ttl_secs, 300);
        assert_eq!(config.release_mode, ReleaseMode::TokenChecked);
    }
}
