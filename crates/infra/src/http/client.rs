use std::time::Duration;

use backoffice_domain::{ApiError, BackofficeError};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// Cookie-carrying HTTP transport shared by the request executor and the
/// refresh coordinator.
///
/// Clones share one connection pool and one cookie jar, so credentials set by
/// the login or refresh response are attached to every later request. A send
/// is a single attempt; retries belong to the caller.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, BackofficeError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    ///
    /// Transport failures become `NETWORK_ERROR`, elapsed timeouts `TIMEOUT`;
    /// any HTTP status (including non-2xx) is returned as a response.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder
            .build()
            .map_err(|err| ApiError::network(format!("failed to build request: {err}")))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(self.transport_error(err))
            }
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            return ApiError::timeout(self.timeout);
        }
        let InfraError(mapped) = InfraError::from(err);
        ApiError::network(mapped.to_string())
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client. Cookies set by the server are always kept and sent
    /// back on later requests.
    ///
    /// # Errors
    ///
    /// Returns `BackofficeError::Config` if reqwest rejects the settings.
    pub fn build(self) -> Result<HttpClient, BackofficeError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            BackofficeError::from(infra)
        })?;

        Ok(HttpClient { client, timeout: self.timeout })
    }
}
