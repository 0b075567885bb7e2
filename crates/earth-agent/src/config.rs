//! Configuration management for Earth Agent
//!
//! Every field has a default so a missing or partial `config.json` is fine.
//! A handful of environment variables override the file for one-off runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::poll::PollPolicy;

/// Environment variable pointing at the directory holding config and settings
pub const HOME_ENV: &str = "EARTH_AGENT_HOME";

pub const DEFAULT_CATALOG_URL: &str =
  "https://raw.githubusercontent.com/samapriya/Earth-Engine-Datasets-List/master/gee_catalog.json";
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EDITOR_URL: &str = "https://code.earthengine.google.com/";
pub const DEFAULT_VALIDATION_URL: &str = "http://127.0.0.1:5000/validate";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file {path}: {source}")]
  Io { path: PathBuf, source: std::io::Error },

  #[error("Invalid config file {path}: {source}")]
  Parse { path: PathBuf, source: serde_json::Error },
}

/// Resolve the Earth Agent home directory (`$EARTH_AGENT_HOME` or `~/.earth-agent`)
pub fn agent_home() -> PathBuf {
  if let Ok(dir) = std::env::var(HOME_ENV) {
    if !dir.trim().is_empty() {
      return PathBuf::from(dir);
    }
  }

  dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".earth-agent")
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
  /// URL of the static JSON dataset catalog
  pub catalog_url: String,
  /// Base URL of the chat completion API
  pub api_base_url: String,
  /// Model used for recommendation and code generation
  pub model: String,
  /// Sampling temperature for code generation
  pub temperature: f32,
  /// Sampling temperature for dataset recommendation
  pub recommend_temperature: f32,
  pub recommend_max_tokens: u32,
  pub codegen_max_tokens: u32,
  /// Sampling temperature for single-call direct generation
  pub direct_temperature: f32,
  /// Earth Engine Code Editor URL; tabs whose URL starts with this are reused
  pub editor_url: String,
  /// Endpoint of the optional validation service
  pub validation_url: String,
  pub request_timeout_secs: u64,
  pub poll: PollConfig,
  /// Extra wait after the run button shows up before injecting into a fresh tab
  pub settle_delay_ms: u64,
}

/// Cadence of the wait-for-editor polling loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
  pub interval_ms: u64,
  pub max_attempts: u32,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self { interval_ms: 3000, max_attempts: 10 }
  }
}

impl Default for AgentConfig {
  fn default() -> Self {
    Self {
      catalog_url: DEFAULT_CATALOG_URL.to_string(),
      api_base_url: DEFAULT_API_BASE_URL.to_string(),
      model: "gpt-4o".to_string(),
      temperature: 0.3,
      recommend_temperature: 0.4,
      recommend_max_tokens: 1500,
      codegen_max_tokens: 2048,
      direct_temperature: 0.2,
      editor_url: DEFAULT_EDITOR_URL.to_string(),
      validation_url: DEFAULT_VALIDATION_URL.to_string(),
      request_timeout_secs: 120,
      poll: PollConfig::default(),
      settle_delay_ms: 2000,
    }
  }
}

impl AgentConfig {
  /// Path of the config file inside the agent home
  pub fn config_path() -> PathBuf {
    agent_home().join("config.json")
  }

  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content)
      .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Load the config file if present, otherwise defaults, then apply env overrides
  pub fn load() -> Result<Self, ConfigError> {
    let path = Self::config_path();
    let mut config = if path.exists() { Self::load_from_file(&path)? } else { Self::default() };
    config.apply_env_overrides();
    Ok(config)
  }

  pub fn apply_env_overrides(&mut self) {
    if let Some(model) = non_empty_env("EARTH_AGENT_MODEL") {
      self.model = model;
    }
    if let Some(url) = non_empty_env("EARTH_AGENT_CATALOG_URL") {
      self.catalog_url = url;
    }
    if let Some(url) = non_empty_env("EARTH_AGENT_API_BASE") {
      self.api_base_url = url;
    }
  }

  pub fn poll_policy(&self) -> PollPolicy {
    PollPolicy::new(Duration::from_millis(self.poll.interval_ms), self.poll.max_attempts)
  }

  pub fn settle_delay(&self) -> Duration {
    Duration::from_millis(self.settle_delay_ms)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

fn non_empty_env(name: &str) -> Option<String> {
  std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn test_partial_file_keeps_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, r#"{"model": "gpt-4o-mini", "poll": {"max_attempts": 3}}"#).unwrap();

    let config = AgentConfig::load_from_file(&path).unwrap();

    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.poll.max_attempts, 3);
    assert_eq!(config.poll.interval_ms, 3000);
    assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
    assert_eq!(config.recommend_max_tokens, 1500);
  }

  #[test]
  fn test_invalid_file_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = AgentConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(error, ConfigError::Parse { .. }));
    assert!(error.to_string().contains("config.json"));
  }

  #[test]
  #[serial]
  fn test_load_uses_home_and_env_overrides() {
    let temp = TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, temp.path());
    std::fs::write(temp.path().join("config.json"), r#"{"model": "from-file"}"#).unwrap();
    std::env::set_var("EARTH_AGENT_MODEL", "from-env");

    let config = AgentConfig::load().unwrap();

    std::env::remove_var("EARTH_AGENT_MODEL");
    std::env::remove_var(HOME_ENV);
    assert_eq!(config.model, "from-env");
  }

  #[test]
  #[serial]
  fn test_load_without_file_is_default() {
    let temp = TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, temp.path());

    let config = AgentConfig::load().unwrap();

    std::env::remove_var(HOME_ENV);
    assert_eq!(config, AgentConfig::default());
  }

  #[test]
  fn test_poll_policy_from_config() {
    let config = AgentConfig::default();
    let policy = config.poll_policy();
    assert_eq!(policy.max_attempts, 10);
    assert_eq!(policy.interval, Duration::from_secs(3));
  }
}
