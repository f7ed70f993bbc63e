//! Error types used outside of individual API requests

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for wiring, configuration and infrastructure failures.
///
/// Per-request failures are reported as [`crate::ApiError`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BackofficeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for backoffice operations
pub type Result<T> = std::result::Result<T, BackofficeError>;
