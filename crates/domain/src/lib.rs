//! # Backoffice Domain
//!
//! Data types shared by every layer of the backoffice session client.
//!
//! This crate contains:
//! - The request error type (`ApiError`) and its classification rules
//! - Session and identity types observed by the presentation layer
//! - Configuration structures
//! - Endpoint and default constants
//!
//! ## Architecture
//! - No dependencies on other backoffice crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod api_error;
pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use api_error::{ApiError, ApiErrorCategory};
pub use config::*;
pub use errors::*;
pub use types::*;
