//! Engine policy: TTLs, lease and retry bounds, and cache key layout.

use std::time::Duration;

use tracing::warn;

use crate::error::{LookupError, Result};
use crate::lock::ReleaseMode;

/// Tuning for [`super::ReadThroughEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Namespace every cache key is prefixed with
    pub namespace: String,
    /// TTL of positive entries
    pub positive_ttl: Duration,
    /// TTL of negative entries; must stay below `positive_ttl`
    pub negative_ttl: Duration,
    /// Lease of a per-key mutex
    pub lock_lease: Duration,
    /// How long `MutexWait` polls for the lease per attempt
    pub lock_wait: Duration,
    /// Poll interval while waiting for the lease
    pub lock_poll_interval: Duration,
    /// Pause between contended attempts
    pub retry_backoff: Duration,
    /// Extra attempts after the first before giving up as contended.
    ///
    /// With the defaults the retry window (about 5s) is shorter than the
    /// lease, so a crashed holder makes callers see `Contended` until the
    /// lease expires.
    pub max_retries: u32,
    /// Bound on a backing store query
    pub store_timeout: Duration,
    /// Bound on a cache backend round trip
    pub cache_timeout: Duration,
    pub release_mode: ReleaseMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "product".to_string(),
            positive_ttl: Duration::from_secs(30 * 60),
            negative_ttl: Duration::from_secs(5 * 60),
            lock_lease: Duration::from_secs(10),
            lock_wait: Duration::from_secs(10),
            lock_poll_interval: Duration::from_millis(25),
            retry_backoff: Duration::from_millis(100),
            max_retries: 50,
            store_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_secs(1),
            release_mode: ReleaseMode::TokenChecked,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_ttls(mut self, positive: Duration, negative: Duration) -> Self {
        self.positive_ttl = positive;
        self.negative_ttl = negative;
        self
    }

    pub fn with_lock(mut self, lease: Duration, wait: Duration, poll: Duration) -> Self {
        self.lock_lease = lease;
        self.lock_wait = wait;
        self.lock_poll_interval = poll;
        self
    }

    pub fn with_retry(mut self, backoff: Duration, max_retries: u32) -> Self {
        self.retry_backoff = backoff;
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeouts(mut self, store: Duration, cache: Duration) -> Self {
        self.store_timeout = store;
        self.cache_timeout = cache;
        self
    }

    pub fn with_release_mode(mut self, mode: ReleaseMode) -> Self {
        self.release_mode = mode;
        self
    }

    /// Rejects settings the lookup protocol cannot honour.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.namespace.is_empty() {
            Some("namespace must not be empty".to_string())
        } else if self.negative_ttl >= self.positive_ttl {
            Some(format!(
                "negative TTL {:?} must be shorter than positive TTL {:?}",
                self.negative_ttl, self.positive_ttl
            ))
        } else if self.lock_lease.is_zero() {
            Some("lock lease must be positive".to_string())
        } else if self.lock_poll_interval.is_zero() {
            Some("lock poll interval must be positive".to_string())
        } else if self.store_timeout.is_zero() || self.cache_timeout.is_zero() {
            Some("timeouts must be positive".to_string())
        } else {
            None
        };

        if let Some(msg) = problem {
            return Err(LookupError::Initialization(msg));
        }

        if self.retry_window() < self.lock_lease {
            warn!(
                retry_window = ?self.retry_window(),
                lease = ?self.lock_lease,
                "retry window shorter than lock lease, a crashed holder surfaces as contention"
            );
        }
        Ok(())
    }

    /// Time a `Mutex` caller spends backing off before giving up.
    pub fn retry_window(&self) -> Duration {
        self.retry_backoff.saturating_mul(self.max_retries)
    }
}

// == Key Space ==
/// Builds the three key families of one namespace.
#[derive(Debug, Clone)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// `product:1`
    pub fn positive(&self, key: i64) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// `null:product:1`
    pub fn negative(&self, key: i64) -> String {
        format!("null:{}:{}", self.namespace, key)
    }

    /// `lock:product:1`
    pub fn lock(&self, key: i64) -> String {
        format!("lock:{}:{}", self.namespace, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = EngineConfig::default();
        assert_eq!(config.positive_ttl, Duration::from_secs(1800));
        assert_eq!(config.negative_ttl, Duration::from_secs(300));
        assert_eq!(config.lock_lease, Duration::from_secs(10));
        assert_eq!(config.retry_backoff, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_ttl_must_be_shorter() {
        let config = EngineConfig::default()
            .with_ttls(Duration::from_secs(60), Duration::from_secs(60));

        assert!(matches!(
            config.validate(),
            Err(LookupError::Initialization(_))
        ));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let config = EngineConfig::default().with_namespace("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_window() {
        assert_eq!(EngineConfig::default().retry_window(), Duration::from_secs(5));

        let outlasting = EngineConfig::default().with_retry(Duration::from_millis(250), 60);
        assert_eq!(outlasting.retry_window(), Duration::from_secs(15));
        assert!(outlasting.retry_window() > outlasting.lock_lease);
        assert!(outlasting.validate().is_ok());
    }

    #[test]
    fn test_key_families() {
        let keys = KeySpace::new("product");

        assert_eq!(keys.positive(1), "product:1");
        assert_eq!(keys.negative(1), "null:product:1");
        assert_eq!(keys.lock(-3), "lock:product:-3");
    }
}
