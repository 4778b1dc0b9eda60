//! `connector providers`: Show the provider catalog.

use connector_config::{AppConfig, ProviderConfig};
use connector_core::ports::ProviderCatalog;
use std::path::Path;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let registry = connector_providers::build_from_config(&config);

    println!("Providers");
    println!("  {:<12} {:<28} {}", "NAME", "DEFAULT MODEL", "API KEY");
    for info in registry.list_providers() {
        let key = if has_key(&config, &info.name) { "set" } else { "missing" };
        println!("  {:<12} {:<28} {}", info.name, info.default_model, key);
    }

    Ok(())
}

fn has_key(config: &AppConfig, provider: &str) -> bool {
    let section: &ProviderConfig = match provider.to_uppercase().as_str() {
        "OPENAI" => &config.providers.openai,
        "ANTHROPIC" => &config.providers.anthropic,
        _ => return false,
    };
    section.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_status_follows_config() {
        let mut config = AppConfig::default();
        config.providers.openai.api_key = Some("sk-test".into());
        config.providers.anthropic.api_key = Some("  ".into());

        assert!(has_key(&config, "openai"));
        assert!(!has_key(&config, "ANTHROPIC"));
        assert!(!has_key(&config, "MISTRAL"));
    }
}
