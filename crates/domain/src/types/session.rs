//! Session state observed by the presentation layer

use serde::{Deserialize, Serialize};

use super::identity::Identity;

/// Client-side session.
///
/// Only the session lifecycle in `backoffice-core` produces new values; the UI
/// renders from whatever it last observed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Session {
    /// Initial state, before any identity check
    #[default]
    Anonymous,
    /// Startup identity probe in flight
    Checking,
    /// Signed in
    Authenticated { user: Identity },
    /// Signed out or expired; terminal until the next successful login
    Unauthenticated,
}

/// Payload-free discriminant of [`Session`], handy for logs and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Anonymous,
    Checking,
    Authenticated,
    Unauthenticated,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Anonymous => SessionPhase::Anonymous,
            Self::Checking => SessionPhase::Checking,
            Self::Authenticated { .. } => SessionPhase::Authenticated,
            Self::Unauthenticated => SessionPhase::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    /// Where the UI should navigate when the session requires a login.
    ///
    /// Returns `None` unless the session is `Unauthenticated`. The current
    /// route is carried as `?redirect=` so the login page can return to it;
    /// it is omitted when the user is already on the login route.
    pub fn login_redirect(&self, login_route: &str, current_route: &str) -> Option<String> {
        if !matches!(self, Self::Unauthenticated) {
            return None;
        }
        if current_route.is_empty() || current_route == "/" || current_route == login_route {
            return Some(login_route.to_string());
        }
        Some(format!("{login_route}?redirect={}", urlencoding::encode(current_route)))
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Anonymous => "anonymous",
            Self::Checking => "checking",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        };
        f.write_str(label)
    }
}
