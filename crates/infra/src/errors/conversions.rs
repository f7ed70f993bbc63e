//! Conversions from external infrastructure errors into domain errors.

use backoffice_domain::BackofficeError;
use reqwest::Error as HttpError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BackofficeError);

impl From<InfraError> for BackofficeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BackofficeError> for InfraError {
    fn from(value: BackofficeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBackofficeError {
    fn into_backoffice(self) -> BackofficeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BackofficeError */
/* -------------------------------------------------------------------------- */

impl IntoBackofficeError for HttpError {
    fn into_backoffice(self) -> BackofficeError {
        if self.is_builder() {
            return BackofficeError::Config(format!("HTTP client setup failed: {self}"));
        }

        if self.is_timeout() {
            return BackofficeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BackofficeError::Network("HTTP connection failure".into());
        }

        BackofficeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_backoffice())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → BackofficeError */
/* -------------------------------------------------------------------------- */

impl IntoBackofficeError for UrlError {
    fn into_backoffice(self) -> BackofficeError {
        BackofficeError::Config(format!("invalid URL: {self}"))
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        InfraError(value.into_backoffice())
    }
}
