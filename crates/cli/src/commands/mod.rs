pub mod ask;
pub mod enqueue;
pub mod init;
pub mod providers;
pub mod routes;
pub mod serve;
pub mod train;

use connector_config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `--config` when given, otherwise `~/.connector/config.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    debug!(path = %path.display(), "Loading config");
    let config = AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}
