//! Single-flight credential refresh
//!
//! All callers that need fresh credentials at the same time share one
//! network call and observe the same outcome. The coordinator is the only
//! writer of its refresh state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use backoffice_domain::constants::REFRESH_PATH;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

/// Something that can renew session credentials
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Returns `true` when the credentials were renewed.
    async fn refresh(&self) -> bool;
}

type RefreshFuture = Shared<BoxFuture<'static, bool>>;

enum RefreshState {
    Idle,
    InFlight { attempt: u64, future: RefreshFuture },
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStats {
    /// Refresh calls that went out on the wire
    pub attempts: u64,
    /// Refreshes the server accepted
    pub successes: u64,
    /// Refreshes that were rejected or never got a response
    pub failures: u64,
    /// Callers that attached to an already running refresh
    pub joined: u64,
}

#[derive(Default)]
struct Counters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    joined: AtomicU64,
}

/// Deduplicating wrapper around the refresh endpoint
pub struct RefreshCoordinator {
    http: HttpClient,
    refresh_url: String,
    state: Arc<Mutex<RefreshState>>,
    counters: Arc<Counters>,
}

impl RefreshCoordinator {
    /// Create a coordinator that posts to `{base_url}/api/v1/internal/auth/refresh`.
    ///
    /// `http` should be the same client the request executor uses so the
    /// renewed cookies land in the shared jar.
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self::with_endpoint(http, format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH))
    }

    /// Coordinator posting to an explicit refresh URL instead of the default path.
    pub fn with_endpoint(http: HttpClient, refresh_url: impl Into<String>) -> Self {
        Self {
            http,
            refresh_url: refresh_url.into(),
            state: Arc::new(Mutex::new(RefreshState::Idle)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Renew credentials, joining an in-flight attempt if there is one.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let (future, joined) = {
            let mut state = self.state.lock();
            let in_flight = match &*state {
                RefreshState::InFlight { future, .. } => Some(future.clone()),
                RefreshState::Idle => None,
            };
            match in_flight {
                Some(future) => (future, true),
                None => {
                    let attempt = self.counters.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.spawn_attempt(attempt);
                    *state = RefreshState::InFlight { attempt, future: future.clone() };
                    (future, false)
                }
            }
        };

        if joined {
            self.counters.joined.fetch_add(1, Ordering::SeqCst);
            debug!("Joining in-flight credential refresh");
        }

        future.await
    }

    /// Forget any in-flight attempt.
    ///
    /// Callers already awaiting it still get its result; the next `refresh`
    /// starts a new network call.
    pub fn reset(&self) {
        *self.state.lock() = RefreshState::Idle;
    }

    /// Whether a refresh is on the wire right now.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::InFlight { .. })
    }

    /// Snapshot of the counters since construction.
    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            attempts: self.counters.attempts.load(Ordering::SeqCst),
            successes: self.counters.successes.load(Ordering::SeqCst),
            failures: self.counters.failures.load(Ordering::SeqCst),
            joined: self.counters.joined.load(Ordering::SeqCst),
        }
    }

    /// Build the shared future for one attempt. It returns the state to
    /// `Idle` itself, unless a `reset` already replaced it.
    fn spawn_attempt(&self, attempt: u64) -> RefreshFuture {
        let http = self.http.clone();
        let url = self.refresh_url.clone();
        let state = Arc::clone(&self.state);
        let counters = Arc::clone(&self.counters);

        async move {
            let renewed = post_refresh(&http, &url).await;

            let counter = if renewed { &counters.successes } else { &counters.failures };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut state = state.lock();
            let still_current =
                matches!(&*state, RefreshState::InFlight { attempt: id, .. } if *id == attempt);
            if still_current {
                *state = RefreshState::Idle;
            }

            renewed
        }
        .boxed()
        .shared()
    }
}

async fn post_refresh(http: &HttpClient, url: &str) -> bool {
    let request = http.request(Method::POST, url).header(CONTENT_TYPE, "application/json");

    match http.send(request).await {
        Ok(response) if response.status().is_success() => {
            info!(status = response.status().as_u16(), "Credentials renewed");
            true
        }
        Ok(response) => {
            warn!(status = response.status().as_u16(), "Credential refresh rejected");
            false
        }
        Err(err) => {
            warn!(code = err.code(), error = %err, "Credential refresh failed");
            false
        }
    }
}

#[async_trait]
impl CredentialRefresher for RefreshCoordinator {
    async fn refresh(&self) -> bool {
        RefreshCoordinator::refresh(self).await
    }
}
