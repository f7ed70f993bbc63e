//! Request executor with transparent credential recovery
//!
//! A logical request is at most two HTTP attempts: on a 401 the client asks
//! the shared [`CredentialRefresher`] for new credentials and, if that
//! succeeds, sends the request exactly once more. When recovery fails the
//! attached [`SessionExpiryHook`] is told the session is over.

use std::sync::{Arc, Weak};
use std::time::Duration;

use backoffice_core::SessionExpiryHook;
use backoffice_domain::api_error::codes;
use backoffice_domain::constants::REQUEST_ID_HEADER;
use backoffice_domain::{ApiConfig, ApiError, BackofficeError};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

use super::refresh::CredentialRefresher;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for API (e.g., "https://admin.example.com")
    pub base_url: String,
    /// Timeout for API requests
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        ApiClientConfig::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for ApiClientConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        }
    }
}

/// Per-request options for [`ApiClient::call`]
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    headers: HeaderMap,
    body: Option<Value>,
    auth_recovery: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, headers: HeaderMap::new(), body: None, auth_recovery: true }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self { method, ..Self::default() }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an `INVALID_ARGUMENT` error if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|err| {
            ApiError::new(codes::INVALID_ARGUMENT, 0, format!("Failed to serialize body: {err}"))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn json_value(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header; it overrides the client defaults for the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Pass a 401 straight to the caller: no refresh, no retry, no expiry
    /// signal. Used for the authentication endpoints themselves.
    pub fn without_auth_recovery(mut self) -> Self {
        self.auth_recovery = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Backend API client
pub struct ApiClient {
    http: HttpClient,
    config: ApiClientConfig,
    refresher: Arc<dyn CredentialRefresher>,
    expiry_hook: RwLock<Option<Weak<dyn SessionExpiryHook>>>,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration
    /// * `http` - Transport; share it with the refresher so they use one cookie jar
    /// * `refresher` - Credential refresher consulted on 401 responses
    pub fn new(
        config: ApiClientConfig,
        http: HttpClient,
        refresher: Arc<dyn CredentialRefresher>,
    ) -> Self {
        Self { http, config, refresher, expiry_hook: RwLock::new(None) }
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Register the receiver of session-expiry signals.
    ///
    /// Held weakly; the session owner usually also owns this client.
    pub fn attach_expiry_hook(&self, hook: Weak<dyn SessionExpiryHook>) {
        *self.expiry_hook.write() = Some(hook);
    }

    /// Execute a request against `endpoint` (a path below the base URL).
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for non-2xx responses that could
    /// not be recovered, transport failures, and undecodable bodies.
    #[instrument(
        skip(self, options),
        fields(method = %options.method, endpoint = %endpoint, request_id = tracing::field::Empty)
    )]
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let epoch = self.session_epoch();
        let url = self.url(endpoint);

        let response = match self.attempt(&url, &options, &request_id).await {
            Err(err) if err.http_status() == 401 && options.auth_recovery => {
                self.recover(&url, &options, &request_id, epoch, err).await?
            }
            other => other?,
        };

        let result = Self::decode(response, &request_id).await?;
        debug!("Request completed");
        Ok(result)
    }

    /// `GET` with session recovery. See [`call`](Self::call).
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.call(endpoint, RequestOptions::get()).await
    }

    /// `POST` a JSON body.
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(endpoint, RequestOptions::post().json(body)?).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(endpoint, RequestOptions::put().json(body)?).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(endpoint, RequestOptions::patch().json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.call(endpoint, RequestOptions::delete()).await
    }

    /// Second phase after a 401: refresh, then one more attempt.
    async fn recover(
        &self,
        url: &str,
        options: &RequestOptions,
        request_id: &str,
        epoch: Option<u64>,
        unauthorized: ApiError,
    ) -> Result<Response, ApiError> {
        debug!("Received 401, refreshing credentials");

        if !self.refresher.refresh().await {
            self.signal_expired(epoch, &unauthorized).await;
            return Err(unauthorized);
        }

        info!("Credentials refreshed, retrying request");
        match self.attempt(url, options, request_id).await {
            Err(err) if err.http_status() == 401 => {
                self.signal_expired(epoch, &err).await;
                Err(err)
            }
            other => other,
        }
    }

    /// One HTTP attempt. Non-2xx statuses come back as classified errors.
    async fn attempt(
        &self,
        url: &str,
        options: &RequestOptions,
        request_id: &str,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .http
            .request(options.method.clone(), url)
            .headers(Self::headers(options, request_id))
            .timeout(self.config.timeout);

        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let response =
            self.http.send(builder).await.map_err(|err| err.or_request_id(request_id))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &body).or_request_id(request_id);
        debug!(status = status.as_u16(), code = err.code(), "Request failed");
        Err(err)
    }

    fn headers(options: &RequestOptions, request_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers.clone());
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        headers
    }

    async fn decode<T: DeserializeOwned>(
        response: Response,
        request_id: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();

        // No body by definition
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(Value::Null).map_err(|err| {
                ApiError::invalid_response(status.as_u16(), err).with_request_id(request_id)
            });
        }

        let bytes = response.bytes().await.map_err(|err| {
            ApiError::invalid_response(status.as_u16(), err).with_request_id(request_id)
        })?;

        let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };

        parsed.map_err(|err| {
            ApiError::invalid_response(status.as_u16(), err).with_request_id(request_id)
        })
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.config.base_url, endpoint)
        } else {
            format!("{}/{}", self.config.base_url, endpoint)
        }
    }

    fn expiry_hook(&self) -> Option<Arc<dyn SessionExpiryHook>> {
        self.expiry_hook.read().as_ref().and_then(Weak::upgrade)
    }

    fn session_epoch(&self) -> Option<u64> {
        self.expiry_hook().map(|hook| hook.epoch())
    }

    async fn signal_expired(&self, epoch: Option<u64>, err: &ApiError) {
        warn!(code = err.code(), "Authentication could not be recovered");
        match (self.expiry_hook(), epoch) {
            (Some(hook), Some(epoch)) => hook.on_session_expired(epoch, err).await,
            _ => debug!("No session attached, expiry not signalled"),
        }
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    http: Option<HttpClient>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing transport instead of building one
    pub fn http(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Set the credential refresher
    pub fn refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the refresher is missing or the transport cannot be
    /// created
    pub fn build(self) -> Result<ApiClient, BackofficeError> {
        let config = self.config.unwrap_or_default();
        url::Url::parse(&config.base_url).map_err(InfraError::from)?;

        let refresher = self
            .refresher
            .ok_or_else(|| BackofficeError::Config("Credential refresher not set".to_string()))?;

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };

        Ok(ApiClient::new(config, http, refresher))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct StubRefresher {
        renew: bool,
        calls: AtomicUsize,
    }

    impl StubRefresher {
        fn new(renew: bool) -> Arc<Self> {
            Arc::new(Self { renew, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl CredentialRefresher for StubRefresher {
        async fn refresh(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.renew
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u32,
    }

    fn client(server: &MockServer, refresher: Arc<StubRefresher>) -> ApiClient {
        ApiClient::builder()
            .config(ApiClientConfig { base_url: server.uri(), timeout: Duration::from_secs(5) })
            .refresher(refresher)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn sends_json_defaults_and_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orders/1"))
            .and(header("content-type", "application/json"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let order: Order = client.get("/api/v1/orders/1").await.unwrap();

        assert_eq!(order, Order { id: 1 });
    }

    #[tokio::test]
    async fn caller_headers_override_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/uploads"))
            .and(header("content-type", "text/csv"))
            .and(header("x-tenant", "acme"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let options = RequestOptions::post()
            .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
            .header(HeaderName::from_static("x-tenant"), HeaderValue::from_static("acme"));

        let result: Option<Value> = client.call("/api/v1/uploads", options).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn posts_serialized_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/orders"))
            .and(body_json(json!({ "sku": "A-1", "quantity": 2 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let order: Order =
            client.post("/api/v1/orders", &json!({ "sku": "A-1", "quantity": 2 })).await.unwrap();

        assert_eq!(order.id, 7);
    }

    #[tokio::test]
    async fn no_content_decodes_as_unit() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/orders/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let result: Result<(), ApiError> = client.delete("/api/v1/orders/1").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn classifies_error_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/products"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": "DUPLICATE_SKU",
                "message": "SKU already exists",
                "requestId": "req-server-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = StubRefresher::new(true);
        let client = client(&server, refresher.clone());
        let err = client
            .post::<_, Value>("/api/v1/products", &json!({ "sku": "A-1" }))
            .await
            .unwrap_err();

        assert!(err.is_conflict_error());
        assert_eq!(err.message(), "SKU already exists");
        assert_eq!(err.request_id(), Some("req-server-1"));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparseable_error_body_uses_status_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/reports"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let err = client.get::<Value>("/api/v1/reports").await.unwrap_err();

        assert_eq!(err.http_status(), 403);
        assert_eq!(err.message(), "Access denied");
        assert!(err.request_id().is_some());
    }

    #[tokio::test]
    async fn retries_once_after_successful_refresh() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        Mock::given(method("GET"))
            .and(path("/api/v1/orders/1"))
            .respond_with(move |_req: &wiremock::Request| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(401)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({ "id": 1 }))
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let refresher = StubRefresher::new(true);
        let client = client(&server, refresher.clone());
        let order: Order = client.get("/api/v1/orders/1").await.unwrap();

        assert_eq!(order.id, 1);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_reuses_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orders"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let err = client.get::<Value>("/api/v1/orders").await.unwrap_err();

        let requests = server.received_requests().await.unwrap();
        let ids: Vec<_> = requests
            .iter()
            .map(|request| request.headers.get("x-request-id").cloned())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
        assert_eq!(
            ids[0].as_ref().and_then(|value| value.to_str().ok()),
            err.request_id()
        );
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_original_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orders"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = StubRefresher::new(false);
        let client = client(&server, refresher.clone());
        let err = client.get::<Value>("/api/v1/orders").await.unwrap_err();

        assert!(err.is_auth_error());
        assert_eq!(err.message(), "Authentication required");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn auth_recovery_can_be_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/internal/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "INVALID_CREDENTIALS",
                "message": "Invalid email or password"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = StubRefresher::new(true);
        let client = client(&server, refresher.clone());
        let options = RequestOptions::post().without_auth_recovery();
        let err =
            client.call::<Value>("/api/v1/internal/auth/login", options).await.unwrap_err();

        assert_eq!(err.code(), codes::INVALID_CREDENTIALS);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn server_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = StubRefresher::new(true);
        let client = client(&server, refresher.clone());
        let err = client.get::<Value>("/api/v1/health").await.unwrap_err();

        assert_eq!(err.code(), codes::SERVER_ERROR);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
            .mount(&server)
            .await;

        let client = client(&server, StubRefresher::new(true));
        let err = client.get::<Order>("/api/v1/orders/1").await.unwrap_err();

        assert_eq!(err.code(), codes::INVALID_RESPONSE);
        assert_eq!(err.http_status(), 200);
    }

    #[test]
    fn builder_requires_refresher() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(BackofficeError::Config(_))));
    }

    #[test]
    fn builder_rejects_invalid_base_url() {
        let result = ApiClient::builder()
            .config(ApiClientConfig {
                base_url: "not a url".into(),
                timeout: Duration::from_secs(1),
            })
            .refresher(StubRefresher::new(true))
            .build();
        assert!(matches!(result, Err(BackofficeError::Config(_))));
    }

    #[test]
    fn joins_endpoint_without_leading_slash() {
        let client = ApiClient::builder()
            .config(ApiClientConfig {
                base_url: "http://localhost:8080".into(),
                timeout: Duration::from_secs(1),
            })
            .refresher(StubRefresher::new(true))
            .build()
            .unwrap();

        assert_eq!(client.url("api/v1/orders"), "http://localhost:8080/api/v1/orders");
        assert_eq!(client.url("/api/v1/orders"), "http://localhost:8080/api/v1/orders");
    }
}
