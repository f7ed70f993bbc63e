//! Request error type and its classification rules
//!
//! Every non-2xx response (and every transport failure) surfaces to callers as
//! an [`ApiError`]. The taxonomy is derived from `code` and `http_status` on
//! demand, so the error never carries a stored category that could disagree
//! with the fields it was built from.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Backend error codes the classifier knows about.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const DUPLICATE_SKU: &str = "DUPLICATE_SKU";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

    // Client-side codes, never sent by the server
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
}

/// Categories of API errors, used for branching behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCategory {
    /// 401 / UNAUTHORIZED / INVALID_CREDENTIALS - recovered once via refresh
    Authentication,
    /// 400 / VALIDATION_ERROR / INVALID_ARGUMENT - never retried
    Validation,
    /// 404 / *_NOT_FOUND - never retried
    NotFound,
    /// 409 / *ALREADY_EXISTS* / DUPLICATE_SKU - never retried
    Conflict,
    /// No response received (connection failure, timeout)
    Transport,
    /// Anything else (403, 5xx, unknown codes)
    Other,
}

/// Failed API request.
///
/// Fields are private: once built, an error is never mutated.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    code: String,
    http_status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

/// Error JSON returned by the backend for every non-2xx response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(default)]
    details: Option<Value>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl ApiError {
    /// Create an error from its required parts
    pub fn new(code: impl Into<String>, http_status: u16, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            http_status,
            message: message.into(),
            details: None,
            request_id: None,
            timestamp: None,
        }
    }

    /// Attach a request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attach a request id unless the server already supplied one
    #[must_use]
    pub fn or_request_id(self, request_id: &str) -> Self {
        if self.request_id.is_some() {
            self
        } else {
            self.with_request_id(request_id)
        }
    }

    /// Classify a failed HTTP response.
    ///
    /// Parses the backend error JSON. When the body does not match that shape
    /// (empty, HTML, truncated, missing fields), a minimal error is synthesized
    /// from the status code alone.
    pub fn from_response(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self {
                code: parsed.error,
                http_status,
                message: parsed.message,
                details: parsed.details.and_then(|value| match value {
                    Value::Object(map) => Some(map),
                    _ => None,
                }),
                request_id: parsed.request_id,
                timestamp: parsed.timestamp,
            },
            Err(_) => Self::from_status(http_status),
        }
    }

    /// Minimal error derived from the HTTP status alone
    pub fn from_status(http_status: u16) -> Self {
        let code = match http_status {
            400 => codes::BAD_REQUEST,
            401 => codes::UNAUTHORIZED,
            403 => codes::FORBIDDEN,
            404 => codes::NOT_FOUND,
            409 => codes::CONFLICT,
            500..=599 => codes::SERVER_ERROR,
            _ => codes::UNKNOWN_ERROR,
        };
        Self::new(code, http_status, fallback_message(http_status))
    }

    /// No response was received
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(codes::NETWORK_ERROR, 0, message)
    }

    /// The request did not complete in time
    pub fn timeout(after: Duration) -> Self {
        Self::new(codes::TIMEOUT, 0, format!("Request timed out after {}s", after.as_secs()))
    }

    /// A 2xx response whose body could not be decoded into the expected type
    pub fn invalid_response(http_status: u16, reason: impl std::fmt::Display) -> Self {
        Self::new(
            codes::INVALID_RESPONSE,
            http_status,
            format!("Failed to parse response: {reason}"),
        )
    }

    /// Machine-readable code, see [`codes`]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// HTTP status, or `0` when no response was received
    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw `details` object from the error body
    pub fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// 401 or one of the credential codes
    pub fn is_auth_error(&self) -> bool {
        self.http_status == 401
            || self.code == codes::UNAUTHORIZED
            || self.code == codes::INVALID_CREDENTIALS
    }

    pub fn is_validation_error(&self) -> bool {
        self.http_status == 400
            || self.code == codes::VALIDATION_ERROR
            || self.code == codes::INVALID_ARGUMENT
    }

    pub fn is_not_found_error(&self) -> bool {
        self.http_status == 404 || self.code.contains(codes::NOT_FOUND)
    }

    pub fn is_conflict_error(&self) -> bool {
        self.http_status == 409
            || self.code.contains(codes::ALREADY_EXISTS)
            || self.code == codes::DUPLICATE_SKU
    }

    /// True when the request never produced an HTTP response
    pub fn is_transport_error(&self) -> bool {
        self.http_status == 0
    }

    /// Get the error category for this error.
    ///
    /// Predicates are checked in taxonomy order, so an error matching more
    /// than one (e.g. status 400 with code `INVALID_CREDENTIALS`) lands in the
    /// first.
    pub fn category(&self) -> ApiErrorCategory {
        if self.is_auth_error() {
            ApiErrorCategory::Authentication
        } else if self.is_validation_error() {
            ApiErrorCategory::Validation
        } else if self.is_not_found_error() {
            ApiErrorCategory::NotFound
        } else if self.is_conflict_error() {
            ApiErrorCategory::Conflict
        } else if self.is_transport_error() {
            ApiErrorCategory::Transport
        } else {
            ApiErrorCategory::Other
        }
    }

    /// Flatten the details map into `(field, message)` pairs for form display.
    ///
    /// Accepts `{"field": "msg"}`, `{"field": ["msg", ...]}` and
    /// `{"field": {"message": "msg"}}`; other shapes are skipped.
    pub fn field_errors(&self) -> Vec<(String, String)> {
        let Some(details) = &self.details else {
            return Vec::new();
        };

        let mut fields = Vec::new();
        for (field, value) in details {
            match value {
                Value::String(message) => fields.push((field.clone(), message.clone())),
                Value::Array(items) => fields.extend(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|message| (field.clone(), message.to_string())),
                ),
                Value::Object(inner) => {
                    if let Some(message) = inner.get("message").and_then(Value::as_str) {
                        fields.push((field.clone(), message.to_string()));
                    }
                }
                _ => {}
            }
        }
        fields
    }
}

fn fallback_message(http_status: u16) -> String {
    match http_status {
        401 => "Authentication required".to_string(),
        403 => "Access denied".to_string(),
        404 => "Resource not found".to_string(),
        _ => format!("Request failed with status {http_status}"),
    }
}
