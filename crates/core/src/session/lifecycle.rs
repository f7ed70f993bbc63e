//! Session state machine
//!
//! `Anonymous -> Checking -> Authenticated | Unauthenticated`, driven by the
//! startup identity probe, login, logout and unrecoverable 401 responses.
//!
//! Every transition runs inside the `watch` channel's write lock together
//! with the generation check, so a probe that resolves after a login (or a
//! logout) can never overwrite the fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use backoffice_domain::{ApiError, LoginCredentials, Session, SessionConfig};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use super::ports::{AuthGateway, ProactiveRefresh, SessionExpiryHook};

/// Owner of the observable [`Session`] value
pub struct SessionLifecycle {
    gateway: Arc<dyn AuthGateway>,
    refresher: Arc<dyn ProactiveRefresh>,
    config: SessionConfig,
    state: watch::Sender<Session>,
    /// Bumped by login and logout; identifies the session a request or probe
    /// was issued under.
    generation: AtomicU64,
    /// Serializes timer start/stop so the last reconcile sees the last state
    timer_lock: Mutex<()>,
}

/// What became of an identity probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Applied,
    /// An expiry signal resolved the session while the probe was running
    AlreadyResolved,
    /// A login or logout happened while the probe was running
    Superseded,
}

impl SessionLifecycle {
    /// Start `Anonymous` with the refresh timer stopped.
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        refresher: Arc<dyn ProactiveRefresh>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(Session::Anonymous);
        Self {
            gateway,
            refresher,
            config,
            state,
            generation: AtomicU64::new(0),
            timer_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the current session
    pub fn current_session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Subscribe to session transitions
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Where the presentation layer should navigate for `current_route`, if
    /// the session requires it.
    pub fn login_redirect(&self, current_route: &str) -> Option<String> {
        if self.config.is_public_route(current_route) {
            return None;
        }
        self.state.borrow().login_redirect(&self.config.login_route, current_route)
    }

    /// Run the startup identity probe.
    ///
    /// Public routes skip the probe and leave the session `Anonymous`. The
    /// probe only starts from `Anonymous`; any other state is returned as is.
    #[instrument(skip(self))]
    pub async fn initialize(&self, current_route: &str) -> Session {
        if self.config.is_public_route(current_route) {
            debug!("Public route, skipping identity probe");
            return self.current_session();
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let started = self.transition_if(|current| {
            matches!(current, Session::Anonymous).then_some(Session::Checking)
        });
        if !started {
            debug!("Identity probe skipped, session already resolved");
            return self.current_session();
        }

        let next = match self.gateway.current_identity().await {
            Ok(user) => Session::Authenticated { user },
            Err(err) => {
                debug!(code = err.code(), status = err.http_status(), "Identity probe failed");
                Session::Unauthenticated
            }
        };

        match self.settle_probe(generation, next) {
            ProbeOutcome::Applied => self.reconcile_refresher().await,
            ProbeOutcome::AlreadyResolved => {
                debug!("Session resolved while the identity probe was running")
            }
            ProbeOutcome::Superseded => info!("Discarding superseded identity probe result"),
        }

        self.current_session()
    }

    /// Apply a probe result if the session is still the one it was issued for.
    fn settle_probe(&self, generation: u64, next: Session) -> ProbeOutcome {
        let applied = self.transition_if(|current| {
            let fresh = self.generation.load(Ordering::SeqCst) == generation;
            (fresh && matches!(current, Session::Checking)).then_some(next)
        });

        if applied {
            ProbeOutcome::Applied
        } else if self.generation.load(Ordering::SeqCst) == generation {
            ProbeOutcome::AlreadyResolved
        } else {
            ProbeOutcome::Superseded
        }
    }

    /// Log in and move straight to `Authenticated` with the returned identity.
    ///
    /// On failure the session is left untouched and the error is returned.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session, ApiError> {
        let user = match self.gateway.login(credentials).await {
            Ok(user) => user,
            Err(err) => {
                warn!(code = err.code(), status = err.http_status(), "Login rejected");
                return Err(err);
            }
        };

        let session = Session::Authenticated { user };
        self.transition_bumping(session.clone());
        self.reconcile_refresher().await;

        Ok(session)
    }

    /// Log out. Always ends in `Unauthenticated`.
    ///
    /// The client-side transition happens before the server call; failures
    /// and timeouts of that call are logged and swallowed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Session {
        self.transition_bumping(Session::Unauthenticated);
        self.reconcile_refresher().await;

        let timeout = self.config.logout_timeout();
        match tokio::time::timeout(timeout, self.gateway.logout()).await {
            Ok(Ok(())) => debug!("Server session closed"),
            Ok(Err(err)) => {
                warn!(code = err.code(), status = err.http_status(), "Server logout failed")
            }
            Err(_) => warn!(timeout_secs = timeout.as_secs(), "Server logout timed out"),
        }

        Session::Unauthenticated
    }

    /// Start or stop the proactive timer to match the current session.
    ///
    /// Runs after every applied transition. Calls are serialized and read the
    /// state under the lock, so a start and a stop racing from concurrent
    /// transitions always settle on the final state.
    async fn reconcile_refresher(&self) {
        let _guard = self.timer_lock.lock().await;
        let authenticated = self.state.borrow().is_authenticated();
        if authenticated {
            self.refresher.start().await;
        } else {
            self.refresher.stop().await;
        }
    }

    fn transition_bumping(&self, next: Session) {
        self.transition_if(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            Some(next)
        });
    }

    /// Apply the transition `decide` yields under the channel lock.
    fn transition_if(&self, decide: impl FnOnce(&Session) -> Option<Session>) -> bool {
        self.state.send_if_modified(|current| {
            let Some(next) = decide(current) else {
                return false;
            };
            info!(from = %current.phase(), to = %next.phase(), "Session transition");
            *current = next;
            true
        })
    }
}

#[async_trait]
impl SessionExpiryHook for SessionLifecycle {
    fn epoch(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn on_session_expired(&self, epoch: u64, error: &ApiError) {
        let expired = self.transition_if(|current| {
            let fresh = self.generation.load(Ordering::SeqCst) == epoch;
            let live = matches!(current, Session::Authenticated { .. } | Session::Checking);
            (fresh && live).then_some(Session::Unauthenticated)
        });

        if expired {
            warn!(code = error.code(), request_id = error.request_id(), "Session expired");
            self.reconcile_refresher().await;
        } else {
            debug!(epoch, "Ignoring expiry signal from a superseded session");
        }
    }
}
