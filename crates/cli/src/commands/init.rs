//! `connector init`: Write a default config file.

use connector_config::AppConfig;
use std::path::Path;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = super::config_path(explicit);

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("Created config directory: {}", dir.display());
    }

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set OPENAI_API_KEY or ANTHROPIC_API_KEY (or add api_key to the file)");
    println!("  2. Add [[routes]] entries for your data types");
    println!("  3. Run: connector serve");

    Ok(())
}
