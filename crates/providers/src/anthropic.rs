//! Anthropic native provider over the Messages API.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field, user prompt as the only message
//! - Text read from `content[0].text`

use async_trait::async_trait;
use connector_core::error::ProviderError;
use connector_core::provider::{ProviderClient, ProviderPayload};
use serde_json::{Value, json};
use tracing::debug;

use crate::http;
use crate::retry::RetryPolicy;

pub const NAME: &str = "ANTHROPIC";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    version: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            default_model: DEFAULT_MODEL.into(),
            version: ANTHROPIC_VERSION.into(),
            retry: RetryPolicy::default(),
            client: http::client(),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ProviderError::NotConfigured("ANTHROPIC_API_KEY is not configured".into())),
        }
    }

    fn request_body(payload: &ProviderPayload) -> Value {
        json!({
            "model": payload.model,
            "system": payload.system_prompt,
            "temperature": payload.effective_temperature(),
            "max_tokens": payload.effective_max_tokens(),
            "messages": [{ "role": "user", "content": payload.user_prompt }],
        })
    }

    /// First content block's text, or the raw body when the shape differs.
    pub fn extract_text(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|root| {
                http::first(&root, "content")
                    .and_then(|block| block.get("text"))
                    .and_then(http::node_text)
            })
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl ProviderClient for AnthropicProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn invoke(&self, payload: &ProviderPayload) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(payload);

        debug!(provider = NAME, model = %payload.model, "Sending completion request");

        let raw = self
            .retry
            .run(NAME, || {
                http::send(
                    NAME,
                    self.client
                        .post(&url)
                        .header("x-api-key", api_key)
                        .header("anthropic-version", &self.version)
                        .json(&body),
                )
            })
            .await?;

        Ok(Self::extract_text(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::MockServer;
    use std::time::Duration;

    fn payload() -> ProviderPayload {
        ProviderPayload {
            provider: NAME.into(),
            model: "claude-sonnet-4-20250514".into(),
            system_prompt: "Extract rules.".into(),
            user_prompt: "conteudo".into(),
            temperature: Some(0.1),
            max_tokens: Some(800),
        }
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new(Some("sk-ant-test".into()));
        assert_eq!(provider.name(), "ANTHROPIC");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.version, "2023-06-01");
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new(None).with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn extract_first_content_block() {
        let body = r#"{"content":[{"type":"text","text":"first"},{"type":"text","text":"second"}]}"#;
        assert_eq!(AnthropicProvider::extract_text(body), "first");
    }

    #[test]
    fn extract_returns_raw_body_on_unknown_shape() {
        for body in [r#"{"content":[]}"#, r#"{"content":[{"type":"tool_use"}]}"#, "<html>oops</html>"] {
            assert_eq!(AnthropicProvider::extract_text(body), body);
        }
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let err = AnthropicProvider::new(None).invoke(&payload()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn invoke_sends_messages_api_request() {
        let server = MockServer::start("/v1/messages", vec![(200, r#"{"content":[{"text":"aprendido"}]}"#)]).await;
        let provider = AnthropicProvider::new(Some("sk-ant".into()))
            .with_base_url(&server.base_url)
            .with_version("2024-01-01");

        assert_eq!(provider.invoke(&payload()).await.unwrap(), "aprendido");

        let hits = server.hits();
        let req = &hits[0];
        assert_eq!(req.headers["x-api-key"], "sk-ant");
        assert_eq!(req.headers["anthropic-version"], "2024-01-01");
        assert_eq!(req.body["system"], "Extract rules.");
        assert_eq!(req.body["max_tokens"], 800);
        assert_eq!(req.body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(req.body["messages"][0]["role"], "user");
        assert_eq!(req.body["messages"][0]["content"], "conteudo");
    }

    #[tokio::test]
    async fn client_error_status_carries_body() {
        let server = MockServer::start("/v1/messages", vec![(400, r#"{"error":"bad model"}"#)]).await;
        let provider = AnthropicProvider::new(Some("sk-ant".into()))
            .with_base_url(&server.base_url)
            .with_retry(RetryPolicy::no_retry(Duration::from_secs(10)));

        let err = provider.invoke(&payload()).await.unwrap_err();
        assert!(err.to_string().contains("bad model"));
        assert_eq!(server.hits().len(), 1);
    }
}
