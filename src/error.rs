//! Error types for the read-through cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Lookup Error Enum ==
/// Unified error type for lookups and the HTTP surface.
///
/// Cache backend failures are absent on purpose: lookups degrade past them.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Backing store failed; never reported as absence
    #[error("Backing store failure: {0}")]
    Store(#[from] StoreError),

    /// Retry ceiling reached while another caller held the key's mutex
    #[error("Key {key} still contended after {attempts} attempts, try later")]
    Contended { key: i64, attempts: u32 },

    /// Caller cancelled while waiting on the mutex or backing off
    #[error("Lookup for key {0} cancelled while waiting")]
    Cancelled(i64),

    /// Record does not exist
    #[error("Product not found: {0}")]
    NotFound(i64),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration or filter parameters
    #[error("Initialization failed: {0}")]
    Initialization(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match &self {
            LookupError::Store(StoreError::Query(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            LookupError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            LookupError::Contended { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LookupError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            LookupError::Initialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LookupError::NotFound(2), StatusCode::NOT_FOUND),
            (
                LookupError::Contended { key: 1, attempts: 51 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LookupError::Store(StoreError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                LookupError::Store(StoreError::Query("syntax".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (LookupError::Cancelled(1), StatusCode::REQUEST_TIMEOUT),
            (
                LookupError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_contended_message_names_key() {
        let error = LookupError::Contended { key: 7, attempts: 3 };
        assert_eq!(
            error.to_string(),
            "Key 7 still contended after 3 attempts, try later"
        );
    }
}
