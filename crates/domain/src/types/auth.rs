//! Login request and response payloads

use serde::{Deserialize, Serialize};

use super::identity::Identity;
use crate::api_error::ApiError;

/// Credentials submitted to the login endpoint
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into(), remember_me: None }
    }

    #[must_use]
    pub fn remember_me(mut self, remember: bool) -> Self {
        self.remember_me = Some(remember);
        self
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// `{ "user": Identity }` body returned by the login and identity endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEnvelope {
    pub user: Identity,
}

/// Login outcome as handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
}

impl From<Result<Identity, ApiError>> for LoginResult {
    fn from(result: Result<Identity, ApiError>) -> Self {
        match result {
            Ok(user) => Self { success: true, error: None, user: Some(user) },
            Err(err) => Self { success: false, error: Some(err.message().to_string()), user: None },
        }
    }
}
