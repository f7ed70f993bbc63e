//! Proactive credential refresh scheduler
//!
//! Renews credentials on a fixed interval through the same
//! [`CredentialRefresher`] the request executor uses, so a timer tick and a
//! 401-triggered refresh that coincide still produce a single network call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoffice_core::ProactiveRefresh;
use backoffice_domain::SessionConfig;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::refresh::CredentialRefresher;
use crate::scheduling::{SchedulerError, SchedulerResult};

/// How long `shutdown` waits for the loop task to wind down
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the refresh scheduler
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Time between refreshes; keep it below the server credential lifetime
    pub interval: Duration,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        RefreshSchedulerConfig::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for RefreshSchedulerConfig {
    fn from(config: &SessionConfig) -> Self {
        Self { interval: config.refresh_interval() }
    }
}

struct RunningTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Background timer that keeps credentials fresh while a session is active
pub struct ProactiveRefreshScheduler {
    refresher: Arc<dyn CredentialRefresher>,
    config: RefreshSchedulerConfig,
    running: Mutex<Option<RunningTimer>>,
}

impl ProactiveRefreshScheduler {
    /// Create a stopped scheduler; nothing runs until [`start`](Self::start).
    pub fn new(refresher: Arc<dyn CredentialRefresher>, config: RefreshSchedulerConfig) -> Self {
        Self { refresher, config, running: Mutex::new(None) }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Start the timer.
    ///
    /// Returns `false` without spawning anything if a timer is already
    /// running. Must be called from within a Tokio runtime.
    #[instrument(skip(self), fields(interval_secs = self.config.interval.as_secs()))]
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|timer| !timer.handle.is_finished()) {
            debug!("Refresh scheduler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::refresh_loop(
            Arc::clone(&self.refresher),
            self.config.interval,
            cancel.clone(),
        ));
        *running = Some(RunningTimer { cancel, handle });

        info!("Refresh scheduler started");
        true
    }

    /// Cancel the timer without waiting for the loop task. Safe to call when
    /// not running.
    pub fn stop(&self) {
        if let Some(timer) = self.running.lock().take() {
            timer.cancel.cancel();
            info!("Refresh scheduler stopped");
        }
    }

    /// Cancel the timer and wait for the loop task to finish.
    ///
    /// # Errors
    ///
    /// Returns error if the task panicked or did not finish in time
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        let timer = self.running.lock().take();
        let Some(timer) = timer else {
            return Ok(());
        };

        timer.cancel.cancel();
        match tokio::time::timeout(STOP_TIMEOUT, timer.handle).await {
            Ok(Ok(())) => {
                info!("Refresh scheduler shut down");
                Ok(())
            }
            Ok(Err(err)) => Err(SchedulerError::TaskJoinFailed(err.to_string())),
            Err(_) => Err(SchedulerError::Timeout { seconds: STOP_TIMEOUT.as_secs() }),
        }
    }

    /// True while the timer task is alive.
    pub fn is_running(&self) -> bool {
        self.running.lock().as_ref().is_some_and(|timer| !timer.handle.is_finished())
    }

    async fn refresh_loop(
        refresher: Arc<dyn CredentialRefresher>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Refresh loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    // A failed tick is not a logout; the next 401 decides.
                    if refresher.refresh().await {
                        debug!("Proactive refresh succeeded");
                    } else {
                        warn!("Proactive credential refresh failed");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ProactiveRefresh for ProactiveRefreshScheduler {
    async fn start(&self) -> bool {
        ProactiveRefreshScheduler::start(self)
    }

    async fn stop(&self) {
        ProactiveRefreshScheduler::stop(self);
    }
}

/// Ensure the timer is stopped when dropped
impl Drop for ProactiveRefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.running.get_mut().take() {
            warn!("ProactiveRefreshScheduler dropped while running; cancelling");
            timer.cancel.cancel();
        }
    }
}
