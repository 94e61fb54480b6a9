//! Shared helpers for Concierge CLI tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory for one test
pub struct TestEnv {
    pub home: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let home = tempdir()?;
        let data_dir = home.path().join(".concierge");
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { home, data_dir })
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Binary with HOME pointed at the test dir and no API keys leaking in
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_concierge"));
        cmd.env("HOME", self.home.path());
        cmd.env_remove("OPENAI_API_KEY");
        cmd.env_remove("OPENROUTER_API_KEY");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::write(self.data_file("config.json"), json)?;
        Ok(())
    }

    /// Config with an OpenAI key whose endpoint refuses connections
    pub fn write_offline_config(&self) -> anyhow::Result<()> {
        self.write_config(
            r#"{
  "assistant": { "defaults": { "oracle_timeout_secs": 5 } },
  "providers": {
    "openai": { "api_key": "sk-test", "api_base": "http://127.0.0.1:9/v1" }
  }
}"#,
        )
    }

    pub fn write_token(&self, json: &str) -> anyhow::Result<()> {
        std::fs::write(self.data_file("token.json"), json)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
