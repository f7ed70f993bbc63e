//! Shared wiring for infra integration tests.
//!
//! Builds the full session stack (transport, refresh coordinator, API
//! client, scheduler, auth gateway and lifecycle) against a mock server.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use backoffice_core::{SessionExpiryHook, SessionLifecycle};
use backoffice_domain::SessionConfig;
use backoffice_infra::{
    ApiClient, ApiClientConfig, AuthApi, HttpClient, ProactiveRefreshScheduler,
    RefreshCoordinator, RefreshSchedulerConfig,
};
use serde_json::{json, Value};

pub struct TestStack {
    pub client: Arc<ApiClient>,
    pub refresh: Arc<RefreshCoordinator>,
    pub scheduler: Arc<ProactiveRefreshScheduler>,
    pub lifecycle: Arc<SessionLifecycle>,
}

impl TestStack {
    pub fn new(base_url: &str) -> Self {
        Self::with_refresh_interval(base_url, Duration::from_secs(600))
    }

    pub fn with_refresh_interval(base_url: &str, interval: Duration) -> Self {
        init_tracing();

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("http client should build");
        let refresh = Arc::new(RefreshCoordinator::new(http.clone(), base_url));
        let client = Arc::new(ApiClient::new(
            ApiClientConfig { base_url: base_url.to_string(), timeout: Duration::from_secs(5) },
            http,
            refresh.clone(),
        ));
        let scheduler = Arc::new(ProactiveRefreshScheduler::new(
            refresh.clone(),
            RefreshSchedulerConfig { interval },
        ));
        let lifecycle = Arc::new(SessionLifecycle::new(
            Arc::new(AuthApi::new(client.clone())),
            scheduler.clone(),
            SessionConfig::default(),
        ));

        let hook: Arc<dyn SessionExpiryHook> = lifecycle.clone();
        client.attach_expiry_hook(Arc::downgrade(&hook));

        Self { client, refresh, scheduler, lifecycle }
    }
}

pub fn user_body(id: &str) -> Value {
    json!({ "user": { "id": id, "email": format!("{id}@example.com"), "role": "admin" } })
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
