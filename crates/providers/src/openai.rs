//! OpenAI provider over the Responses API.
//!
//! - `POST {base_url}/v1/responses` with Bearer authentication
//! - system and user prompts sent as the two `input` entries
//! - text read from `output_text`, then `output[0].content[0].text`

use async_trait::async_trait;
use connector_core::error::ProviderError;
use connector_core::provider::{ProviderClient, ProviderPayload};
use serde_json::{Value, json};
use tracing::debug;

use crate::http;
use crate::retry::RetryPolicy;

pub const NAME: &str = "OPENAI";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            default_model: DEFAULT_MODEL.into(),
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

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ProviderError::NotConfigured("OPENAI_API_KEY is not configured".into())),
        }
    }

    fn request_body(payload: &ProviderPayload) -> Value {
        json!({
            "model": payload.model,
            "temperature": payload.effective_temperature(),
            "max_output_tokens": payload.effective_max_tokens(),
            "input": [
                { "role": "system", "content": payload.system_prompt },
                { "role": "user", "content": payload.user_prompt },
            ],
        })
    }

    /// Pull the answer out of a Responses API body, or hand back the raw body.
    pub fn extract_text(body: &str) -> String {
        let Ok(root) = serde_json::from_str::<Value>(body) else {
            return body.to_string();
        };

        if let Some(text) = root.get("output_text").and_then(http::node_text) {
            return text;
        }

        http::first(&root, "output")
            .and_then(|output| http::first(output, "content"))
            .and_then(|content| content.get("text"))
            .and_then(http::node_text)
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl ProviderClient for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn invoke(&self, payload: &ProviderPayload) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1/responses", self.base_url);
        let body = Self::request_body(payload);

        debug!(provider = NAME, model = %payload.model, "Sending completion request");

        let raw = self
            .retry
            .run(NAME, || {
                http::send(NAME, self.client.post(&url).bearer_auth(api_key).json(&body))
            })
            .await?;

        Ok(Self::extract_text(&raw))
    }
}
