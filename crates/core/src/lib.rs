//! # Backoffice Core
//!
//! Session business logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The session state machine observed by the presentation layer
//! - Port interfaces (traits) implemented by the infrastructure layer
//!
//! ## Architecture Principles
//! - Only depends on `backoffice-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits

pub mod session;

pub use session::ports::{AuthGateway, ProactiveRefresh, SessionExpiryHook};
pub use session::SessionLifecycle;
