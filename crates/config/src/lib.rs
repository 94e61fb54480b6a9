//! Configuration management for the travel concierge
//!
//! Handles loading and saving assistant, provider and calendar settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_home};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variables consulted when no key is configured, in order
pub const API_KEY_ENV_VARS: &[&str] = &["OPENAI_API_KEY", "OPENROUTER_API_KEY"];

/// LLM provider credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// All supported providers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub openrouter: ProviderConfig,
}

/// Planning loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
}

impl Default for AssistantDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_iterations: default_max_iterations(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_iterations() -> u32 {
    15
}

fn default_oracle_timeout_secs() -> u64 {
    60
}

/// Assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    #[serde(default)]
    pub defaults: AssistantDefaults,
}

/// Google Calendar access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// OAuth client secrets downloaded from the cloud console
    #[serde(default = "default_client_secrets")]
    pub client_secrets: String,
    /// Cached user credential
    #[serde(default = "default_token_file")]
    pub token_file: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_calendar_api_base")]
    pub api_base: String,
    #[serde(default = "default_calendar_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_secrets: default_client_secrets(),
            token_file: default_token_file(),
            calendar_id: default_calendar_id(),
            time_zone: default_time_zone(),
            api_base: default_calendar_api_base(),
            timeout_secs: default_calendar_timeout_secs(),
        }
    }
}

fn default_client_secrets() -> String {
    "~/.concierge/credentials.json".to_string()
}

fn default_token_file() -> String {
    "~/.concierge/token.json".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_time_zone() -> String {
    "America/New_York".to_string()
}

fn default_calendar_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_calendar_timeout_secs() -> u64 {
    30
}

impl CalendarConfig {
    pub fn client_secrets_path(&self) -> PathBuf {
        expand_home(&self.client_secrets)
    }

    pub fn token_path(&self) -> PathBuf {
        expand_home(&self.token_file)
    }
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ no config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("◆ reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Configured API key, without consulting the environment
    pub fn configured_api_key(&self) -> Option<String> {
        [&self.providers.openai, &self.providers.openrouter]
            .into_iter()
            .map(|p| p.api_key.clone())
            .find(|key| !key.is_empty())
    }

    /// API key from config, falling back to the environment
    pub fn api_key(&self) -> Option<String> {
        self.configured_api_key().or_else(|| {
            API_KEY_ENV_VARS
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|key| !key.is_empty())
        })
    }

    /// Explicit API base, if any
    pub fn api_base(&self) -> Option<String> {
        if !self.providers.openai.api_key.is_empty() {
            return self.providers.openai.api_base.clone();
        }

        if !self.providers.openrouter.api_key.is_empty() {
            return self
                .providers
                .openrouter
                .api_base
                .clone()
                .or_else(|| Some("https://openrouter.ai/api/v1".to_string()));
        }

        None
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn default_model(&self) -> String {
        self.assistant.defaults.model.clone()
    }

    /// At least one, so the oracle is always consulted
    pub fn max_tool_iterations(&self) -> u32 {
        match self.assistant.defaults.max_tool_iterations {
            0 => {
                warn!("max_tool_iterations is 0 in config, using 1");
                1
            }
            n => n,
        }
    }

    pub fn oracle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.assistant.defaults.oracle_timeout_secs)
    }

    pub fn calendar_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.calendar.timeout_secs)
    }
}

/// Write a default config if none exists and make sure the data dir is there
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ config already present at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ config written to {:?}", config_path);
    }

    tokio::fs::create_dir_all(data_dir()).await?;

    Config::load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_paths_expand_home() {
        let config = CalendarConfig::default();
        let token = config.token_path();
        assert!(token.ends_with(".concierge/token.json"));
        assert!(!token.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_api_base_prefers_openai() {
        let mut config = Config::default();
        config.providers.openai.api_key = "sk-test".to_string();
        config.providers.openrouter.api_key = "sk-or-test".to_string();
        assert_eq!(config.api_base(), None);

        config.providers.openai.api_key.clear();
        assert_eq!(
            config.api_base(),
            Some("https://openrouter.ai/api/v1".to_string())
        );
    }

    #[test]
    fn test_timeouts() {
        let config = Config::default();
        assert_eq!(config.oracle_timeout().as_secs(), 60);
        assert_eq!(config.calendar_timeout().as_secs(), 30);
    }
}
