//! Configuration loading, validation, and management for the connector.
//!
//! Loads configuration from `~/.connector/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use connector_core::route::{RouteConfig, RouteRule, WILDCARD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.connector/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Vendor credentials and call policy
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Route/context/queue storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prompt assembly limits and defaults
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Training queue driver
    #[serde(default)]
    pub training: TrainingConfig,

    /// Routes seeded into the store at startup
    #[serde(default)]
    pub routes: Vec<RouteSeed>,
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .field("storage", &self.storage)
            .field("inference", &self.inference)
            .field("training", &self.training)
            .field("routes", &self.routes)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// When set, callers must send it in `X-Connector-Key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8085
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,

    #[serde(default)]
    pub anthropic: ProviderConfig,
}

/// Per-vendor settings. Unset URL/model/version fall back to the vendor's
/// built-in defaults.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// API version header (Anthropic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("version", &self.version)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Bounded retry and overall timeout around each outbound provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    2
}
fn default_delay_ms() -> u64 {
    300
}
fn default_timeout_secs() -> u64 {
    130
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// SQLite database file (ignored by the memory backend)
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}
fn default_db_path() -> String {
    AppConfig::config_dir().join("connector.db").display().to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Snippets fetched per context tier
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,

    /// Request/response summaries written to the audit log are cut to this
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Used when the route has no system prompt
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

fn default_context_limit() -> usize {
    8
}
fn default_summary_max_chars() -> usize {
    1000
}
fn default_system_prompt() -> String {
    "You are a corporate assistant.".into()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            context_limit: default_context_limit(),
            summary_max_chars: default_summary_max_chars(),
            default_system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_every_secs")]
    pub every_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_batch_size() -> usize {
    20
}
fn default_every_secs() -> u64 {
    60
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
            every_secs: default_every_secs(),
        }
    }
}

/// A `[[routes]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSeed {
    pub route_key: String,
    pub data_type: String,

    #[serde(default = "default_characteristic")]
    pub characteristic: String,

    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Route-tier context snippets
    #[serde(default)]
    pub context: Vec<String>,
}

fn default_characteristic() -> String {
    WILDCARD.into()
}

impl RouteSeed {
    /// Build the stored rule. The store assigns the final route id.
    pub fn to_rule(&self, route_id: i64) -> RouteRule {
        RouteRule {
            data_type: self.data_type.clone(),
            characteristic: self.characteristic.clone(),
            priority: self.priority,
            enabled: self.enabled,
            route: RouteConfig {
                route_id,
                route_key: self.route_key.clone(),
                provider: self.provider.clone(),
                model: self.model.clone(),
                system_prompt: self.system_prompt.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `CONNECTOR_API_KEY` and
    /// `CONNECTOR_DB_PATH` from `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.providers.anthropic.api_key = Some(key);
        }
        if let Some(key) = get("CONNECTOR_API_KEY") {
            self.gateway.api_key = Some(key);
        }
        if let Some(path) = get("CONNECTOR_DB_PATH") {
            self.storage.path = path;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".connector")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError("gateway.port must be non-zero".into()));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::ValidationError("training.batch_size must be >= 1".into()));
        }
        if self.training.every_secs == 0 {
            return Err(ConfigError::ValidationError("training.every_secs must be >= 1".into()));
        }
        if self.inference.context_limit == 0 {
            return Err(ConfigError::ValidationError(
                "inference.context_limit must be >= 1".into(),
            ));
        }

        for route in &self.routes {
            let blank = [
                ("data_type", &route.data_type),
                ("characteristic", &route.characteristic),
                ("provider", &route.provider),
            ]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());
            if let Some((field, _)) = blank {
                return Err(ConfigError::ValidationError(format!(
                    "route '{}': {field} must not be blank",
                    route.route_key
                )));
            }
            if let Some(t) = route.temperature
                && !(0.0..=2.0).contains(&t)
            {
                return Err(ConfigError::ValidationError(format!(
                    "route '{}': temperature must be between 0.0 and 2.0",
                    route.route_key
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for connector_core::Error {
    fn from(e: ConfigError) -> Self {
        connector_core::Error::Config { message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8085);
        assert_eq!(config.inference.context_limit, 8);
        assert_eq!(config.inference.summary_max_chars, 1000);
        assert_eq!(config.training.batch_size, 20);
        assert_eq!(config.providers.openai.retry.max_retries, 2);
        assert_eq!(config.providers.anthropic.retry.timeout_secs, 130);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.storage.path.ends_with("connector.db"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.training.every_secs, config.training.every_secs);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().gateway.host, "127.0.0.1");
    }

    #[test]
    fn routes_parse_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[storage]
backend = "memory"

[providers.openai]
api_key = "sk-test"
[providers.openai.retry]
max_retries = 0

[[routes]]
route_key = "SUPPORT_DEFAULT"
data_type = "SUPPORT"
characteristic = "FAQ"
provider = "OPENAI"
model = "gpt-5"
context = ["regra 1", "regra 2"]

[[routes]]
route_key = "SUPPORT_FALLBACK"
data_type = "SUPPORT"
provider = "ANTHROPIC"
priority = 5
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.providers.openai.retry.max_retries, 0);
        assert_eq!(config.providers.openai.retry.delay_ms, 300);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].context.len(), 2);
        assert_eq!(config.routes[1].characteristic, "*");
        assert!(config.routes[1].enabled);

        let rule = config.routes[0].to_rule(42);
        assert_eq!(rule.route.route_id, 42);
        assert_eq!(rule.route.model.as_deref(), Some("gpt-5"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[gateway\nport = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.gateway.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.routes.push(RouteSeed {
            route_key: "R".into(),
            data_type: "SUPPORT".into(),
            characteristic: "*".into(),
            provider: "OPENAI".into(),
            model: None,
            system_prompt: None,
            temperature: Some(3.5),
            max_tokens: None,
            priority: 0,
            enabled: true,
            context: vec![],
        });
        assert!(config.validate().is_err());

        config.routes[0].temperature = Some(0.3);
        config.routes[0].provider = " ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("provider"));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("ANTHROPIC_API_KEY", ""),
            ("CONNECTOR_API_KEY", "secret"),
            ("CONNECTOR_DB_PATH", "/tmp/c.db"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-env"));
        assert!(config.providers.anthropic.api_key.is_none());
        assert_eq!(config.gateway.api_key.as_deref(), Some("secret"));
        assert_eq!(config.storage.path, "/tmp/c.db");
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.providers.openai.api_key = Some("sk-very-secret".into());
        config.gateway.api_key = Some("gateway-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("gateway-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("8085"));
        assert!(toml_str.contains("batch_size"));
    }
}
