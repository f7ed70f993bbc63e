use std::time::Duration;

use backoffice_domain::{ApiError, ApiErrorCategory, BackofficeError, LoggingConfig, Result};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter` when set.
///
/// # Errors
///
/// Returns `BackofficeError::Config` for an unparsable filter and
/// `BackofficeError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|err| {
        BackofficeError::Internal(format!("Failed to install tracing subscriber: {err}"))
    })
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|err| {
            BackofficeError::Config(format!("Invalid log filter '{}': {err}", config.filter))
        }),
    }
}

/// Log the outcome of a command execution with structured fields.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&ApiError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => warn!(
            command,
            duration_ms,
            error_type = error_label(err),
            code = err.code(),
            status = err.http_status(),
            request_id = err.request_id().unwrap_or_default(),
            "command_execution_failure"
        ),
    }
}

/// Convert an `ApiError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &ApiError) -> &'static str {
    match error.category() {
        ApiErrorCategory::Authentication => "auth",
        ApiErrorCategory::Validation => "validation",
        ApiErrorCategory::NotFound => "not_found",
        ApiErrorCategory::Conflict => "conflict",
        ApiErrorCategory::Transport => "transport",
        ApiErrorCategory::Other => "other",
    }
}
