//! Application constants
//!
//! Endpoint paths and defaults shared by the config loader and the client.

// Auth endpoints (relative to the API base URL)
pub const LOGIN_PATH: &str = "/api/v1/internal/auth/login";
pub const CURRENT_IDENTITY_PATH: &str = "/api/v1/internal/auth/me";
pub const REFRESH_PATH: &str = "/api/v1/internal/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/v1/internal/auth/logout";

// Request defaults
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Session defaults
/// Shorter than the expected credential lifetime; the server does not expose
/// the real TTL, so this stays configurable.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_LOGOUT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/login", "/forgot-password", "/reset-password"];

// Logging defaults
pub const DEFAULT_LOG_FILTER: &str = "info";
