//! Tests for Config serialization, defaults and file round trips

use concierge_config::{expand_home, AssistantDefaults, CalendarConfig, Config, ConfigError};
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a temporary directory for tests
fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.assistant.defaults.model, "gpt-4o-mini");
    assert_eq!(config.assistant.defaults.max_tokens, 4096);
    assert_eq!(config.assistant.defaults.temperature, 0.0);
    assert_eq!(config.assistant.defaults.max_tool_iterations, 15);
    assert_eq!(config.assistant.defaults.oracle_timeout_secs, 60);

    assert_eq!(config.calendar.calendar_id, "primary");
    assert_eq!(config.calendar.time_zone, "America/New_York");
    assert_eq!(
        config.calendar.api_base,
        "https://www.googleapis.com/calendar/v3"
    );
    assert_eq!(config.calendar.token_file, "~/.concierge/token.json");
    assert_eq!(
        config.calendar.client_secrets,
        "~/.concierge/credentials.json"
    );

    assert!(config.providers.openai.api_key.is_empty());
    assert!(config.providers.openrouter.api_base.is_none());
}

#[test]
fn test_partial_json_fills_defaults() {
    let json = r#"{
        "assistant": { "defaults": { "model": "gpt-4o" } },
        "calendar": { "time_zone": "Europe/London" }
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.assistant.defaults.model, "gpt-4o");
    assert_eq!(config.assistant.defaults.max_tool_iterations, 15);
    assert_eq!(config.calendar.time_zone, "Europe/London");
    assert_eq!(config.calendar.calendar_id, "primary");
}

#[test]
fn test_empty_json_is_default() {
    let config: Config = serde_json::from_str("{}").unwrap();
    let defaults = AssistantDefaults::default();
    assert_eq!(config.assistant.defaults.model, defaults.model);
    assert_eq!(config.calendar.timeout_secs, CalendarConfig::default().timeout_secs);
}

#[test]
fn test_zero_iterations_raised_to_one() {
    let json = r#"{"assistant": {"defaults": {"max_tool_iterations": 0}}}"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.assistant.defaults.max_tool_iterations, 0);
    assert_eq!(config.max_tool_iterations(), 1);
}

#[tokio::test]
async fn test_load_missing_file_returns_defaults() {
    let dir = temp_dir();
    let path = dir.path().join("missing.json");

    let config = Config::load_from(&path).await.unwrap();
    assert_eq!(config.default_model(), "gpt-4o-mini");
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = temp_dir();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.assistant.defaults.model = "openai/gpt-4o".to_string();
    config.assistant.defaults.max_tool_iterations = 8;
    config.providers.openrouter.api_key = "sk-or-test".to_string();
    config.calendar.calendar_id = "team@example.com".to_string();

    config.save_to(&path).await.unwrap();
    assert!(path.exists());

    let loaded = Config::load_from(&path).await.unwrap();
    assert_eq!(loaded.default_model(), "openai/gpt-4o");
    assert_eq!(loaded.max_tool_iterations(), 8);
    assert_eq!(loaded.providers.openrouter.api_key, "sk-or-test");
    assert_eq!(loaded.calendar.calendar_id, "team@example.com");
}

#[tokio::test]
async fn test_load_invalid_json_fails() {
    let dir = temp_dir();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let result = Config::load_from(&path).await;
    assert!(matches!(result, Err(ConfigError::Json(_))));
}

#[test]
fn test_expand_home() {
    let home = dirs::home_dir().expect("No home dir");
    assert_eq!(expand_home("~/trips/token.json"), home.join("trips/token.json"));
    assert_eq!(expand_home("~"), home);
    assert_eq!(expand_home("/etc/token.json"), PathBuf::from("/etc/token.json"));
    assert_eq!(expand_home("relative.json"), PathBuf::from("relative.json"));
}

#[test]
fn test_config_error_display() {
    let json_err = serde_json::from_str::<Config>("{not json").unwrap_err();
    let err: ConfigError = json_err.into();
    assert!(err.to_string().starts_with("invalid config json"));

    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: ConfigError = io_err.into();
    assert!(err.to_string().contains("file not found"));
}
