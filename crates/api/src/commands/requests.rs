//! Generic backend calls for the presentation layer

use backoffice_domain::api_error::codes;
use backoffice_domain::ApiError;
use backoffice_infra::RequestOptions;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// Backend request as sent by the UI
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    /// Path below the API base URL, e.g. `/api/v1/orders`
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ApiRequest {
    /// `GET` request without a body
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), method: default_method(), body: None }
    }

    fn options(&self) -> Result<RequestOptions, ApiError> {
        let method =
            Method::from_bytes(self.method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                let message = format!("Unsupported method: {}", self.method);
                ApiError::new(codes::INVALID_ARGUMENT, 0, message)
            })?;

        let options = RequestOptions::new(method);
        Ok(match &self.body {
            Some(body) => options.json_value(body.clone()),
            None => options,
        })
    }
}

/// Execute a backend call with session recovery.
///
/// A 401 triggers one credential refresh and one retry; an unrecoverable 401
/// also moves the session to `Unauthenticated`.
pub async fn call(ctx: &AppContext, request: ApiRequest) -> Result<Value, ApiError> {
    let client = &ctx.api;
    let request = &request;

    execute_logged("requests::call", || async move {
        let options = request.options()?;
        client.call(&request.endpoint, options).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn method_defaults_to_get() {
        let request: ApiRequest =
            serde_json::from_value(json!({ "endpoint": "/api/v1/orders" })).unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.options().unwrap().method(), &Method::GET);
    }

    #[test]
    fn method_is_case_insensitive() {
        let request: ApiRequest = serde_json::from_value(json!({
            "endpoint": "/api/v1/orders",
            "method": "post",
            "body": { "sku": "A-1" }
        }))
        .unwrap();

        assert_eq!(request.options().unwrap().method(), &Method::POST);
    }

    #[test]
    fn invalid_method_is_rejected() {
        let request = ApiRequest { method: "NOT A METHOD".to_string(), ..ApiRequest::get("/x") };

        let err = request.options().unwrap_err();
        assert!(err.is_validation_error());
    }
}
