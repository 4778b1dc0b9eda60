//! LLM provider implementations for the connector.
//!
//! All providers implement the `connector_core::ProviderClient` trait.
//! The registry resolves a provider by the name a route carries.

mod http;
pub mod anthropic;
pub mod openai;
pub mod registry;
pub mod retry;

#[cfg(test)]
mod test_server;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use registry::{ProviderRegistry, build_from_config};
pub use retry::RetryPolicy;
