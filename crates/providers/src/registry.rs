//! Provider registry: holds every known client keyed by upper-cased name.
//!
//! Handles provider creation from config and name-based lookup.

use connector_config::{AppConfig, ProviderConfig};
use connector_core::error::{Error, Result};
use connector_core::ports::ProviderCatalog;
use connector_core::provider::{ProviderClient, ProviderInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAiProvider;
use crate::retry::RetryPolicy;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name. A later registration with the
    /// same name (in any case) replaces the earlier one.
    pub fn register(&mut self, provider: Arc<dyn ProviderClient>) {
        let key = provider.name().to_uppercase();
        debug!(provider = %key, "Registering provider");
        self.providers.insert(key, provider);
    }

    pub fn with(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderClient>> {
        self.providers.get(&name.to_uppercase()).cloned()
    }

    /// Registered names, sorted case-insensitively.
    pub fn names(&self) -> Vec<String> {
        self.list_providers().into_iter().map(|info| info.name).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ProviderCatalog for ProviderRegistry {
    fn require(&self, name: &str) -> Result<Arc<dyn ProviderClient>> {
        self.get(name)
            .ok_or_else(|| Error::UnsupportedProvider(name.to_string()))
    }

    fn list_providers(&self) -> Vec<ProviderInfo> {
        let mut list: Vec<ProviderInfo> = self.providers.values().map(|p| p.info()).collect();
        list.sort_by_key(|info| info.name.to_lowercase());
        list
    }
}

/// Build the OpenAI and Anthropic clients from configuration.
///
/// Both are always registered; a missing key only surfaces when the
/// provider is invoked.
pub fn build_from_config(config: &AppConfig) -> ProviderRegistry {
    ProviderRegistry::new()
        .with(Arc::new(openai_from(&config.providers.openai)))
        .with(Arc::new(anthropic_from(&config.providers.anthropic)))
}

fn openai_from(cfg: &ProviderConfig) -> OpenAiProvider {
    let mut provider = OpenAiProvider::new(cfg.api_key.clone()).with_retry(RetryPolicy::from(&cfg.retry));
    if let Some(url) = &cfg.base_url {
        provider = provider.with_base_url(url);
    }
    if let Some(model) = &cfg.default_model {
        provider = provider.with_default_model(model);
    }
    provider
}

fn anthropic_from(cfg: &ProviderConfig) -> AnthropicProvider {
    let mut provider = AnthropicProvider::new(cfg.api_key.clone()).with_retry(RetryPolicy::from(&cfg.retry));
    if let Some(url) = &cfg.base_url {
        provider = provider.with_base_url(url);
    }
    if let Some(model) = &cfg.default_model {
        provider = provider.with_default_model(model);
    }
    if let Some(version) = &cfg.version {
        provider = provider.with_version(version);
    }
    provider
}
