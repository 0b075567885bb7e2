//! Persisted user settings: the API key and the validation toggle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::config::agent_home;

/// Value shipped in config templates; never treated as a real key
pub const PLACEHOLDER_KEY: &str = "your-api-key-here";

#[derive(Error, Debug)]
pub enum SettingsError {
  #[error("Failed to access settings file {path}: {source}")]
  Io { path: PathBuf, source: std::io::Error },

  #[error("Settings file {path} is corrupt: {source}")]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("Failed to serialize settings: {0}")]
  Serialize(#[from] serde_json::Error),
}

impl SettingsError {
  fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io { path: path.to_path_buf(), source }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,

  #[serde(default)]
  pub validation_enabled: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Settings {
  pub fn set_api_key(&mut self, key: &str) {
    let key = key.trim();
    self.api_key = if key.is_empty() { None } else { Some(key.to_string()) };
    self.touch();
  }

  pub fn clear_api_key(&mut self) {
    self.api_key = None;
    self.touch();
  }

  pub fn set_validation_enabled(&mut self, enabled: bool) {
    self.validation_enabled = enabled;
    self.touch();
  }

  fn touch(&mut self) {
    self.updated_at = Some(Utc::now());
  }

  /// Stored key masked for display, e.g. `sk-a…wxyz`
  pub fn masked_api_key(&self) -> Option<String> {
    self.api_key.as_deref().map(mask_key)
  }
}

fn mask_key(key: &str) -> String {
  let chars: Vec<char> = key.chars().collect();
  if chars.len() <= 8 {
    return "*".repeat(chars.len());
  }
  let head: String = chars[..4].iter().collect();
  let tail: String = chars[chars.len() - 4..].iter().collect();
  format!("{head}…{tail}")
}

/// A stored key is trusted outright only when it looks like a real key
pub fn is_usable_stored_key(key: &str) -> bool {
  let key = key.trim();
  !key.is_empty() && key != PLACEHOLDER_KEY && key.starts_with("sk-")
}

/// Pick the key for this invocation.
///
/// A usable stored key wins, then the key entered for this run, then any
/// other non-placeholder stored key. `None` means generation must not start.
pub fn resolve_api_key(settings: &Settings, entered: Option<&str>) -> Option<String> {
  let stored = settings.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());

  if let Some(key) = stored.filter(|k| is_usable_stored_key(k)) {
    return Some(key.to_string());
  }

  if let Some(key) = entered.map(str::trim).filter(|k| !k.is_empty()) {
    return Some(key.to_string());
  }

  stored.filter(|k| *k != PLACEHOLDER_KEY).map(str::to_string)
}

/// Key-value store holding [`Settings`]
pub trait SettingsStore {
  fn load(&self) -> Result<Settings, SettingsError>;
  fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// JSON file store, `<home>/settings.json` by default
pub struct FileSettingsStore {
  path: PathBuf,
}

impl FileSettingsStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn default_location() -> Self {
    Self::new(agent_home().join("settings.json"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl SettingsStore for FileSettingsStore {
  fn load(&self) -> Result<Settings, SettingsError> {
    if !self.path.exists() {
      return Ok(Settings::default());
    }

    let content = fs::read_to_string(&self.path).map_err(|e| SettingsError::io(&self.path, e))?;
    serde_json::from_str(&content)
      .map_err(|source| SettingsError::Parse { path: self.path.clone(), source })
  }

  fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&self.path, content).map_err(|e| SettingsError::io(&self.path, e))?;

    // the file holds an API key
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let perms = fs::Permissions::from_mode(0o600);
      fs::set_permissions(&self.path, perms).map_err(|e| SettingsError::io(&self.path, e))?;
    }

    Ok(())
  }
}

/// In-memory store for tests and one-shot embedding
#[derive(Default)]
pub struct MemorySettingsStore {
  settings: Mutex<Settings>,
}

impl MemorySettingsStore {
  pub fn new(settings: Settings) -> Self {
    Self { settings: Mutex::new(settings) }
  }
}

impl SettingsStore for MemorySettingsStore {
  fn load(&self) -> Result<Settings, SettingsError> {
    Ok(self.settings.lock().map(|s| s.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone()))
  }

  fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
    match self.settings.lock() {
      Ok(mut guard) => *guard = settings.clone(),
      Err(poisoned) => *poisoned.into_inner() = settings.clone(),
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn with_key(key: &str) -> Settings {
    Settings { api_key: Some(key.to_string()), ..Settings::default() }
  }

  #[test]
  fn test_stored_sk_key_wins_over_entered() {
    let settings = with_key("sk-stored");
    assert_eq!(resolve_api_key(&settings, Some("sk-entered")).as_deref(), Some("sk-stored"));
  }

  #[test]
  fn test_entered_key_used_when_stored_key_is_placeholder() {
    let settings = with_key(PLACEHOLDER_KEY);
    assert_eq!(resolve_api_key(&settings, Some("  sk-entered ")).as_deref(), Some("sk-entered"));
    assert_eq!(resolve_api_key(&settings, None), None);
  }

  #[test]
  fn test_non_sk_stored_key_is_last_resort() {
    let settings = with_key("proxy-key");
    assert_eq!(resolve_api_key(&settings, Some("sk-entered")).as_deref(), Some("sk-entered"));
    assert_eq!(resolve_api_key(&settings, None).as_deref(), Some("proxy-key"));
  }

  #[test]
  fn test_no_key_anywhere() {
    assert_eq!(resolve_api_key(&Settings::default(), None), None);
    assert_eq!(resolve_api_key(&Settings::default(), Some("   ")), None);
  }

  #[test]
  fn test_masked_key() {
    assert_eq!(with_key("sk-abcdefghijklmnop").masked_api_key().as_deref(), Some("sk-a…mnop"));
    assert_eq!(with_key("short").masked_api_key().as_deref(), Some("*****"));
  }

  #[test]
  fn test_file_store_round_trip_and_missing_file() {
    let temp = TempDir::new().unwrap();
    let store = FileSettingsStore::new(temp.path().join("nested").join("settings.json"));

    assert_eq!(store.load().unwrap(), Settings::default());

    let mut settings = Settings::default();
    settings.set_api_key("sk-saved");
    settings.set_validation_enabled(true);
    store.save(&settings).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.api_key.as_deref(), Some("sk-saved"));
    assert!(loaded.validation_enabled);
    assert!(loaded.updated_at.is_some());
  }

  #[test]
  fn test_corrupt_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    fs::write(&path, "[1, 2").unwrap();

    let error = FileSettingsStore::new(&path).load().unwrap_err();
    assert!(matches!(error, SettingsError::Parse { .. }));
  }

  #[test]
  fn test_blank_key_clears() {
    let mut settings = with_key("sk-old");
    settings.set_api_key("   ");
    assert!(settings.api_key.is_none());
  }
}
