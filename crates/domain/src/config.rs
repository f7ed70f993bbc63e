//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_LOGIN_ROUTE, DEFAULT_LOGOUT_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_PUBLIC_ROUTES, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Session lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Proactive refresh period; must stay below the server credential TTL
    pub refresh_interval_secs: u64,
    /// Upper bound on the best-effort server logout call
    pub logout_timeout_secs: u64,
    pub login_route: String,
    /// Routes that never trigger the startup identity probe
    pub public_routes: Vec<String>,
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub filter: String,
    pub json: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SessionConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn logout_timeout(&self) -> Duration {
        Duration::from_secs(self.logout_timeout_secs)
    }

    /// True when `route` (path, optionally with a query string) is public.
    ///
    /// A public route also covers its sub-paths: `/reset-password` matches
    /// `/reset-password/abc`.
    pub fn is_public_route(&self, route: &str) -> bool {
        let path = route.split(['?', '#']).next().unwrap_or(route);
        self.public_routes.iter().any(|public| {
            path == public
                || path
                    .strip_prefix(public.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_API_BASE_URL.to_string(), timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            logout_timeout_secs: DEFAULT_LOGOUT_TIMEOUT_SECS,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|route| (*route).to_string()).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string(), json: false }
    }
}
