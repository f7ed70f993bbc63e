//! Authentication endpoints
//!
//! Cookie-based login, identity probe and logout against the internal auth
//! API. Login and logout bypass the executor's 401 recovery: a rejected
//! password is a login failure, not an expired session.

use std::sync::Arc;

use async_trait::async_trait;
use backoffice_core::AuthGateway;
use backoffice_domain::constants::{CURRENT_IDENTITY_PATH, LOGIN_PATH, LOGOUT_PATH};
use backoffice_domain::{ApiError, Identity, IdentityEnvelope, LoginCredentials};
use serde::de::IgnoredAny;
use tracing::{debug, info, instrument};

use super::client::{ApiClient, RequestOptions};

/// [`AuthGateway`] backed by the API client
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    /// Wrap a client; login and logout calls never trigger a refresh.
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthGateway for AuthApi {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &LoginCredentials) -> Result<Identity, ApiError> {
        let options = RequestOptions::post().json(credentials)?.without_auth_recovery();
        let envelope: IdentityEnvelope = self.client.call(LOGIN_PATH, options).await?;

        info!(user_id = %envelope.user.id, "Logged in");
        Ok(envelope.user)
    }

    /// Identity probe. Goes through normal 401 recovery, so an expired
    /// access cookie with a valid refresh cookie still resolves.
    #[instrument(skip(self))]
    async fn current_identity(&self) -> Result<Identity, ApiError> {
        let envelope: IdentityEnvelope =
            self.client.call(CURRENT_IDENTITY_PATH, RequestOptions::get()).await?;

        debug!(user_id = %envelope.user.id, "Identity resolved");
        Ok(envelope.user)
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        let options = RequestOptions::post().without_auth_recovery();
        let _: IgnoredAny = self.client.call(LOGOUT_PATH, options).await?;
        Ok(())
    }
}
