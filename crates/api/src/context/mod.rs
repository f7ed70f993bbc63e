//! Application context - dependency injection container

use std::sync::Arc;

use backoffice_core::{SessionExpiryHook, SessionLifecycle};
use backoffice_domain::{Config, Result};
use backoffice_infra::config;
use backoffice_infra::{
    ApiClient, ApiClientConfig, AuthApi, HttpClient, ProactiveRefreshScheduler,
    RefreshCoordinator, RefreshSchedulerConfig,
};
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub refresh: Arc<RefreshCoordinator>,
    pub refresh_scheduler: Arc<ProactiveRefreshScheduler>,
    pub session: Arc<SessionLifecycle>,
}

impl AppContext {
    /// Create a context from the environment or a config file
    ///
    /// # Errors
    ///
    /// Returns error if no valid configuration is found or the HTTP client
    /// cannot be created
    pub fn new() -> Result<Self> {
        let config = config::load()?;
        Self::new_with_config(config)
    }

    /// Create a context from an explicit configuration
    ///
    /// Every service shares one HTTP client so request, refresh and logout
    /// calls all see the same cookie jar. Must be called from within a Tokio
    /// runtime when the session later starts the refresh scheduler.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client cannot
    /// be created
    pub fn new_with_config(config: Config) -> Result<Self> {
        config::validate(&config)?;

        let http = HttpClient::builder()
            .timeout(config.api.timeout())
            .user_agent(concat!("backoffice-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let refresh = Arc::new(RefreshCoordinator::new(http.clone(), &config.api.base_url));
        let api = Arc::new(
            ApiClient::builder()
                .config(ApiClientConfig::from(&config.api))
                .http(http)
                .refresher(refresh.clone())
                .build()?,
        );

        let refresh_scheduler = Arc::new(ProactiveRefreshScheduler::new(
            refresh.clone(),
            RefreshSchedulerConfig::from(&config.session),
        ));
        let session = Arc::new(SessionLifecycle::new(
            Arc::new(AuthApi::new(api.clone())),
            refresh_scheduler.clone(),
            config.session.clone(),
        ));

        // The client only holds the lifecycle weakly; `session` keeps it alive.
        let hook: Arc<dyn SessionExpiryHook> = session.clone();
        api.attach_expiry_hook(Arc::downgrade(&hook));

        info!(base_url = %config.api.base_url, "Application context ready");

        Ok(Self { config, api, refresh, refresh_scheduler, session })
    }

    /// Stop background work.
    ///
    /// # Errors
    ///
    /// Returns error if the refresh loop does not stop in time
    pub async fn shutdown(&self) -> Result<()> {
        self.refresh_scheduler.shutdown().await?;
        info!("Application context shut down");
        Ok(())
    }
}
