//! Record and response models
//!
//! Defines the product record served by the cache and the DTOs used for
//! serializing HTTP response bodies.

pub mod product;
pub mod responses;

// Re-export commonly used types
pub use product::Product;
pub use responses::{ErrorResponse, FilterSummary, HealthResponse, RebuildResponse, StatsResponse};
