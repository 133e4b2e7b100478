//! API Module
//!
//! HTTP handlers and routing for the product lookup REST API.
//!
//! # Endpoints
//! - `GET /api/products/:id` - Direct store lookup
//! - `GET /api/products/:strategy/:id` - Lookup through a protection strategy
//! - `POST /api/admin/bloom-filter/rebuild` - Rebuild the existence filter
//! - `GET /stats` - Lookup statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
