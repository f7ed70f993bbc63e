//! Session lifecycle: login, logout, startup identity probe and expiry.

pub mod lifecycle;
pub mod ports;

pub use lifecycle::SessionLifecycle;
