//! Commands - presentation to backend bridge
//!
//! Every command takes the shared [`AppContext`](crate::AppContext) and
//! returns serde-friendly values; failures are typed [`ApiError`]s.
//!
//! [`ApiError`]: backoffice_domain::ApiError

mod auth;
mod requests;

pub use auth::*;
pub use requests::*;
