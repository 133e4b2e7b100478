//! Hotkey Cache - a read-through product cache that shields its store
//!
//! Serves point lookups through a cache backend with protection against
//! stampedes on hot keys and penetration by keys that do not exist.

pub mod api;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod lock;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use engine::{EngineConfig, ReadThroughEngine, Strategy};
pub use error::LookupError;
pub use tasks::spawn_cleanup_task;
