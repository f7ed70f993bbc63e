//! Command execution helpers
//!
//! Provides utilities to reduce boilerplate when implementing commands with
//! timing and logging.

use std::future::Future;
use std::time::Instant;

use backoffice_domain::ApiError;

use crate::utils::logging::log_command_execution;

/// Execute a command with automatic timing and logging
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &AppContext) -> Result<Value, ApiError> {
///     execute_logged("my_module::my_command", || async {
///         ctx.api.get("/api/v1/things").await
///     })
///     .await
/// }
/// ```
pub async fn execute_logged<F, Fut, T>(command_name: &str, command_fn: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let start = Instant::now();
    let result = command_fn().await;

    log_command_execution(command_name, start.elapsed(), result.as_ref().err());

    result
}
