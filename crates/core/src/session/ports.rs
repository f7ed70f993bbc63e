//! Port interfaces for session management
//!
//! These traits define the boundaries between the session state machine
//! and the HTTP implementations that back it.

use async_trait::async_trait;
use backoffice_domain::{ApiError, Identity, LoginCredentials};

/// Authentication endpoints of the backend
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a session; the response carries the identity
    async fn login(&self, credentials: &LoginCredentials) -> Result<Identity, ApiError>;

    /// Identity probe for an existing session cookie
    async fn current_identity(&self) -> Result<Identity, ApiError>;

    /// Server-side session teardown
    async fn logout(&self) -> Result<(), ApiError>;
}

/// Background credential renewal timer
#[async_trait]
pub trait ProactiveRefresh: Send + Sync {
    /// Start the timer. Returns `false` when it was already running.
    async fn start(&self) -> bool;

    /// Stop the timer. No-op when not running.
    async fn stop(&self);
}

/// Receiver of unrecoverable authentication failures from the request
/// executor.
///
/// The executor reads [`epoch`](Self::epoch) before sending a request and
/// passes it back with the failure, so the receiver can discard signals from
/// requests issued under a session that has since been replaced.
#[async_trait]
pub trait SessionExpiryHook: Send + Sync {
    fn epoch(&self) -> u64;

    async fn on_session_expired(&self, epoch: u64, error: &ApiError);
}
