//! Distributed Mutex Module
//!
//! Advisory, lease-bounded, key-scoped mutual exclusion on top of a
//! [`CacheBackend`]. Acquisition is an atomic set-if-absent whose TTL is the
//! lease; a crashed or cancelled holder is released by the TTL alone.
//!
//! There is no queueing or fairness. Contention is resolved by callers
//! retrying, which can starve a caller under sustained load.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{BackendError, BackendResult, CacheBackend};

/// Proof of holding a lease; its bytes are what the lock entry stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of [`DistributedMutex::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// The lease ran out first; with token checks, a later holder is left alone
    AlreadyExpired,
}

/// How a lease is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// Delete only if the entry still holds our token
    #[default]
    TokenChecked,
    /// Delete whatever holds the key
    Unconditional,
}

impl FromStr for ReleaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" | "token-checked" => Ok(ReleaseMode::TokenChecked),
            "unconditional" => Ok(ReleaseMode::Unconditional),
            other => Err(format!("unknown release mode '{}'", other)),
        }
    }
}

/// Why a waiting acquisition ended without a decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("lock wait cancelled")]
    Cancelled,
}

// == Distributed Mutex ==
#[derive(Clone)]
pub struct DistributedMutex {
    backend: Arc<dyn CacheBackend>,
    release_mode: ReleaseMode,
    /// Bound on each backend round trip
    op_timeout: Duration,
}

impl DistributedMutex {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        release_mode: ReleaseMode,
        op_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            release_mode,
            op_timeout,
        }
    }

    // == Acquire ==
    /// Makes one attempt to take `resource` for `lease`.
    ///
    /// Returns `None` when someone else holds it.
    pub async fn acquire(&self, resource: &str, lease: Duration) -> BackendResult<Option<LockToken>> {
        let token = LockToken::generate();
        let stored = self
            .bounded(self.backend.set_if_absent_with_ttl(
                resource,
                token.as_str().as_bytes().to_vec(),
                lease,
            ))
            .await?;

        if stored {
            debug!(resource, token = %token, "lock acquired");
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    // == Acquire Within ==
    /// Polls `acquire` every `poll` until it succeeds or `wait` has elapsed.
    ///
    /// Always makes at least one attempt. Returns `Cancelled` as soon as
    /// `cancel` fires, so an abandoned caller never lingers in the loop.
    pub async fn acquire_within(
        &self,
        resource: &str,
        lease: Duration,
        wait: Duration,
        poll: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<LockToken>, LockError> {
        let deadline = Instant::now() + wait;

        loop {
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled);
            }
            if let Some(token) = self.acquire(resource, lease).await? {
                return Ok(Some(token));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let pause = poll.min(deadline - now);

            tokio::select! {
                _ = cancel.cancelled() => return Err(LockError::Cancelled),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    // == Release ==
    /// Gives up a lease taken with `token`.
    pub async fn release(&self, resource: &str, token: &LockToken) -> BackendResult<ReleaseOutcome> {
        let removed = match self.release_mode {
            ReleaseMode::TokenChecked => {
                self.bounded(self.backend.delete_if_equals(resource, token.as_str().as_bytes()))
                    .await?
            }
            ReleaseMode::Unconditional => self.bounded(self.backend.delete(resource)).await?,
        };

        if removed {
            debug!(resource, token = %token, "lock released");
            Ok(ReleaseOutcome::Released)
        } else {
            warn!(resource, token = %token, "lease expired before release");
            Ok(ReleaseOutcome::AlreadyExpired)
        }
    }

    async fn bounded<T>(
        &self,
        op: impl std::future::Future<Output = BackendResult<T>>,
    ) -> BackendResult<T> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .unwrap_or(Err(BackendError::Timeout(self.op_timeout)))
    }
}
