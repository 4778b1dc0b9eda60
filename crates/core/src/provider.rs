//! Provider trait, the abstraction over LLM backends.
//!
//! A provider takes a normalized [`ProviderPayload`] and returns plain text,
//! either all at once or as a stream of chunks.
//!
//! Implementations: OpenAI (Responses API), Anthropic (Messages API).

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Temperature used when neither the route nor the caller sets one.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Output token cap used when neither the route nor the caller sets one.
pub const DEFAULT_MAX_TOKENS: u32 = 1200;

/// The normalized request handed to a provider. One per dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayload {
    pub provider: String,
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderPayload {
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// Read-only catalog entry derived from a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub default_model: String,
}

/// A stream of text chunks from a provider.
pub type ChunkStream = BoxStream<'static, Result<String, ProviderError>>;

/// Lazily splits a completed response into lines.
///
/// This is the degraded streaming fallback: the full text already exists,
/// chunks are produced on demand, and a clone restarts from the same point.
#[derive(Debug, Clone)]
pub struct LineChunks {
    text: String,
    pos: usize,
}

impl LineChunks {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: 0,
        }
    }

    /// Turn the remaining lines into a [`ChunkStream`].
    pub fn into_stream(self) -> ChunkStream {
        futures::stream::iter(self.map(Ok)).boxed()
    }
}

impl Iterator for LineChunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.pos >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.pos..];
        let (line, advance) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        Some(line.strip_suffix('\r').unwrap_or(line).to_string())
    }
}

/// The core provider trait.
///
/// Every LLM backend implements this. The orchestrator calls `invoke()` or
/// `stream()` without knowing which vendor is behind it.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Catalog name (e.g. "OPENAI", "ANTHROPIC").
    fn name(&self) -> &str;

    /// Model used when the route does not name one.
    fn default_model(&self) -> &str;

    /// Send the payload and return the response text.
    async fn invoke(&self, payload: &ProviderPayload) -> Result<String, ProviderError>;

    /// Send the payload and get a stream of text chunks.
    ///
    /// Default implementation calls `invoke()` and yields the result line by line.
    async fn stream(&self, payload: &ProviderPayload) -> Result<ChunkStream, ProviderError> {
        let output = self.invoke(payload).await?;
        Ok(LineChunks::new(output).into_stream())
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            default_model: self.default_model().to_string(),
        }
    }
}
