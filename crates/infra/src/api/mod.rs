//! Backend API client
//!
//! This module provides the cookie-authenticated client used by every
//! backend call, together with the pieces that keep its session alive.
//!
//! # Architecture
//!
//! - `ApiClient` executes requests; a 401 triggers one refresh and one retry
//! - `RefreshCoordinator` deduplicates concurrent refreshes (single-flight)
//! - `ProactiveRefreshScheduler` renews credentials on a timer through the
//!   same coordinator
//! - `AuthApi` implements the core `AuthGateway` port on top of `ApiClient`

pub mod auth;
pub mod client;
pub mod refresh;
pub mod scheduler;

pub use auth::AuthApi;
pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig, RequestOptions};
pub use refresh::{CredentialRefresher, RefreshCoordinator, RefreshStats};
pub use scheduler::{ProactiveRefreshScheduler, RefreshSchedulerConfig};
