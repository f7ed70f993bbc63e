//! Shared test helpers for `backoffice-core` integration tests.
//!
//! Scriptable fakes for the session ports so lifecycle tests can control
//! when the identity probe resolves and how the server answers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use backoffice_core::{AuthGateway, ProactiveRefresh, SessionLifecycle};
use backoffice_domain::{ApiError, Identity, LoginCredentials, SessionConfig};
use parking_lot::Mutex;
use tokio::sync::oneshot;

pub fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: email.to_string(),
        first_name: None,
        last_name: None,
        role: "admin".to_string(),
    }
}

pub fn invalid_credentials() -> ApiError {
    ApiError::from_response(
        401,
        r#"{"error":"INVALID_CREDENTIALS","message":"Invalid email or password"}"#,
    )
}

/// How the fake server answers the logout call
#[derive(Clone, Copy)]
pub enum LogoutBehavior {
    Succeed,
    NetworkError,
    Hang,
}

pub struct FakeGateway {
    login_result: Mutex<Result<Identity, ApiError>>,
    probe_result: Mutex<Result<Identity, ApiError>>,
    probe_gate: Mutex<Option<oneshot::Receiver<Result<Identity, ApiError>>>>,
    logout_behavior: Mutex<LogoutBehavior>,
    pub probe_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            login_result: Mutex::new(Ok(identity("u-login", "login@example.com"))),
            probe_result: Mutex::new(Err(ApiError::from_status(401))),
            probe_gate: Mutex::new(None),
            logout_behavior: Mutex::new(LogoutBehavior::Succeed),
            probe_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_login_result(&self, result: Result<Identity, ApiError>) {
        *self.login_result.lock() = result;
    }

    pub fn set_probe_result(&self, result: Result<Identity, ApiError>) {
        *self.probe_result.lock() = result;
    }

    pub fn set_logout_behavior(&self, behavior: LogoutBehavior) {
        *self.logout_behavior.lock() = behavior;
    }

    /// Hold the next identity probe until the returned sender fires.
    pub fn gate_probe(&self) -> oneshot::Sender<Result<Identity, ApiError>> {
        let (tx, rx) = oneshot::channel();
        *self.probe_gate.lock() = Some(rx);
        tx
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn login(&self, _credentials: &LoginCredentials) -> Result<Identity, ApiError> {
        self.login_result.lock().clone()
    }

    async fn current_identity(&self) -> Result<Identity, ApiError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.probe_gate.lock().take();
        if let Some(rx) = gate {
            return rx.await.unwrap_or_else(|_| Err(ApiError::network("probe dropped")));
        }
        let result = self.probe_result.lock().clone();
        result
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.logout_behavior.lock();
        match behavior {
            LogoutBehavior::Succeed => Ok(()),
            LogoutBehavior::NetworkError => Err(ApiError::network("connection refused")),
            LogoutBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Records start/stop calls and whether the timer would be running
#[derive(Default)]
pub struct FakeTimer {
    running: Mutex<bool>,
    stop_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeTimer {
    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Hold the next `stop` call until the returned sender fires.
    pub fn gate_stop(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.stop_gate.lock() = Some(rx);
        tx
    }
}

#[async_trait]
impl ProactiveRefresh for FakeTimer {
    async fn start(&self) -> bool {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let mut running = self.running.lock();
        let started = !*running;
        *running = true;
        started
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let gate = self.stop_gate.lock().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        *self.running.lock() = false;
    }
}

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub timer: Arc<FakeTimer>,
    pub lifecycle: Arc<SessionLifecycle>,
}

pub fn harness() -> Harness {
    let gateway = Arc::new(FakeGateway::new());
    let timer = Arc::new(FakeTimer::default());
    let lifecycle = Arc::new(SessionLifecycle::new(
        gateway.clone(),
        timer.clone(),
        SessionConfig::default(),
    ));
    Harness { gateway, timer, lifecycle }
}
