//! # Backoffice Infrastructure
//!
//! Infrastructure implementations of core session ports.
//!
//! This crate contains:
//! - The cookie-carrying HTTP transport
//! - The API client with 401 recovery and single-flight refresh
//! - The proactive refresh scheduler
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `backoffice-core`
//! - Depends on `backoffice-domain` and `backoffice-core`
//! - Contains all "impure" code (network, environment, files)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod scheduling;

// Re-export commonly used items
pub use api::*;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use scheduling::{SchedulerError, SchedulerResult};
