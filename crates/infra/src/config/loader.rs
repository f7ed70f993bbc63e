//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If the required variable is missing, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `BACKOFFICE_API_BASE_URL`: Backend base URL (required)
//! - `BACKOFFICE_API_TIMEOUT`: Request timeout in seconds
//! - `BACKOFFICE_REFRESH_INTERVAL`: Proactive refresh interval in seconds
//! - `BACKOFFICE_LOGOUT_TIMEOUT`: Server logout timeout in seconds
//! - `BACKOFFICE_LOGIN_ROUTE`: Route of the login page
//! - `BACKOFFICE_PUBLIC_ROUTES`: Comma separated routes that skip the
//!   startup identity probe
//! - `BACKOFFICE_LOG_FILTER`: Default log filter directive
//! - `BACKOFFICE_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./backoffice.json` or `./backoffice.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use backoffice_domain::{ApiConfig, BackofficeError, Config, LoggingConfig, Result, SessionConfig};
use url::Url;

use crate::errors::InfraError;

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `BackofficeError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `BACKOFFICE_API_BASE_URL` is required; every other value falls back
/// to its default.
///
/// # Errors
/// Returns `BackofficeError::Config` if the base URL is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();

    let api = ApiConfig {
        base_url: env_var("BACKOFFICE_API_BASE_URL")?,
        timeout_secs: env_parse("BACKOFFICE_API_TIMEOUT", defaults.api.timeout_secs)?,
    };

    let session = SessionConfig {
        refresh_interval_secs: env_parse(
            "BACKOFFICE_REFRESH_INTERVAL",
            defaults.session.refresh_interval_secs,
        )?,
        logout_timeout_secs: env_parse(
            "BACKOFFICE_LOGOUT_TIMEOUT",
            defaults.session.logout_timeout_secs,
        )?,
        login_route: std::env::var("BACKOFFICE_LOGIN_ROUTE")
            .unwrap_or(defaults.session.login_route),
        public_routes: std::env::var("BACKOFFICE_PUBLIC_ROUTES")
            .map(|routes| split_list(&routes))
            .unwrap_or(defaults.session.public_routes),
    };

    let logging = LoggingConfig {
        filter: std::env::var("BACKOFFICE_LOG_FILTER").unwrap_or(defaults.logging.filter),
        json: env_bool("BACKOFFICE_LOG_JSON", defaults.logging.json),
    };

    let config = Config { api, session, logging };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `BackofficeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BackofficeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BackofficeError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BackofficeError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Check values that deserialize fine but cannot work at runtime
///
/// # Errors
/// Returns `BackofficeError::Config` describing the first invalid value.
pub fn validate(config: &Config) -> Result<()> {
    let url = Url::parse(&config.api.base_url).map_err(InfraError::from)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BackofficeError::Config(format!(
            "API base URL must use http or https, got {}",
            url.scheme()
        )));
    }

    if config.api.timeout_secs == 0 {
        return Err(BackofficeError::Config("API timeout must be positive".into()));
    }

    if config.session.refresh_interval_secs == 0 {
        return Err(BackofficeError::Config("Refresh interval must be positive".into()));
    }

    if config.session.logout_timeout_secs == 0 {
        return Err(BackofficeError::Config("Logout timeout must be positive".into()));
    }

    if !config.session.login_route.starts_with('/') {
        return Err(BackofficeError::Config(format!(
            "Login route must be an absolute path, got {}",
            config.session.login_route
        )));
    }

    Ok(())
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `BackofficeError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BackofficeError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BackofficeError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BackofficeError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 6] = [
        "config.json",
        "config.toml",
        "backoffice.json",
        "backoffice.toml",
        "../config.json",
        "../config.toml",
    ];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `BackofficeError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        BackofficeError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, using `default` when unset
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| BackofficeError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
}
