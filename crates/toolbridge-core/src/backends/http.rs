//! HTTP plumbing shared by the wire-level backends

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{BackendError, BackendResult};
use super::traits::BackendSettings;

/// Build the HTTP client for a backend
pub(crate) fn build_client(settings: &BackendSettings) -> BackendResult<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(BackendError::from)
}

/// Require an API key from the settings
pub(crate) fn require_api_key(settings: &BackendSettings) -> BackendResult<String> {
    settings
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| BackendError::missing_api_key(settings.kind.as_str()))
}

/// Send a request and return the body of a successful response
pub(crate) async fn send(backend: &str, request: RequestBuilder) -> BackendResult<String> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(BackendError::api(backend, status.as_u16(), error_message(&body)));
    }
    Ok(body)
}

/// Decode a response body
pub(crate) fn decode<T: DeserializeOwned>(backend: &str, body: &str) -> BackendResult<T> {
    serde_json::from_str(body)
        .map_err(|e| BackendError::invalid_response(backend, format!("malformed JSON: {}", e)))
}

/// Pull `error.message` out of an error body, or fall back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
