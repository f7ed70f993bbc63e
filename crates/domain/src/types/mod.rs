//! Domain types observed by the presentation layer

pub mod auth;
pub mod identity;
pub mod session;

pub use auth::{IdentityEnvelope, LoginCredentials, LoginResult};
pub use identity::Identity;
pub use session::{Session, SessionPhase};
