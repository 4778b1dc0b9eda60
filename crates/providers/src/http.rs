//! Shared HTTP plumbing for the vendor clients.

use connector_core::error::ProviderError;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Build the client used by every vendor: 20s connect, 120s per request.
pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(20))
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Send a prepared request and return the body text.
///
/// Any status >= 300 is an error carrying the response body.
pub(crate) async fn send(provider: &str, request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(format!("{provider}: {e}"))
        } else {
            ProviderError::Network(format!("{provider}: {e}"))
        }
    })?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(format!("{provider}: failed to read body: {e}")))?;

    if status >= 300 {
        warn!(provider, status, body = %body, "Provider returned an error status");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: body,
        });
    }

    Ok(body)
}

/// Text form of a JSON node: strings as-is, other scalars/objects serialized.
pub(crate) fn node_text(node: &Value) -> Option<String> {
    match node {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `root[key][0]` when `root[key]` is a non-empty array.
pub(crate) fn first<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    root.get(key)?.as_array()?.first()
}
