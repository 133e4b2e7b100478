//! Read-Through Engine Module
//!
//! Orchestrates the cache backend, existence filter and distributed mutex
//! into lookup strategies of increasing robustness.
//!
//! # Strategies
//! - `Passthrough` - always query the store
//! - `CacheAside` - positive cache only; absent keys always reach the store
//! - `NegativeCache` - also remembers confirmed absences for a short TTL
//! - `ExistenceFilter` - bloom filter rejects keys the store never had
//! - `Mutex` - per-key lease serializes store queries on a miss
//! - `MutexWait` - as `Mutex`, but waits for the lease before backing off

mod policy;
mod read_through;
mod stats;

#[cfg(test)]
mod property_tests;

use std::fmt;
use std::str::FromStr;

use crate::error::LookupError;

// Re-export public types
pub use policy::{EngineConfig, KeySpace};
pub use read_through::ReadThroughEngine;
pub use stats::{LookupStats, LookupStatsSnapshot};

// == Strategy ==
/// Selects the lookup protocol for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Passthrough,
    CacheAside,
    NegativeCache,
    ExistenceFilter,
    Mutex,
    MutexWait,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Passthrough,
        Strategy::CacheAside,
        Strategy::NegativeCache,
        Strategy::ExistenceFilter,
        Strategy::Mutex,
        Strategy::MutexWait,
    ];

    /// Name used in logs and in the strategy route segment.
    ///
    /// `Passthrough` has its own route and never parses from a segment.
    pub fn route_name(&self) -> &'static str {
        match self {
            Strategy::Passthrough => "direct",
            Strategy::CacheAside => "cache",
            Strategy::NegativeCache => "null-cache",
            Strategy::ExistenceFilter => "bloom-filter",
            Strategy::Mutex => "lock",
            Strategy::MutexWait => "wait-lock",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_name())
    }
}

impl FromStr for Strategy {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .filter(|strategy| *strategy != Strategy::Passthrough)
            .find(|strategy| strategy.route_name() == s)
            .ok_or_else(|| LookupError::InvalidRequest(format!("Unknown lookup strategy '{}'", s)))
    }
}
