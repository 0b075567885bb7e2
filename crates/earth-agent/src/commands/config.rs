use anyhow::{Context, Result};

use super::load_config;
use crate::config::AgentConfig;
use crate::settings::{FileSettingsStore, SettingsStore};

fn store() -> FileSettingsStore {
  FileSettingsStore::default_location()
}

pub fn show() -> Result<()> {
  let config = load_config()?;
  let store = store();
  let settings = store.load().context("Failed to load settings")?;

  println!("Config file:      {}", AgentConfig::config_path().display());
  println!("Settings file:    {}", store.path().display());
  println!("API key:          {}", settings.masked_api_key().unwrap_or_else(|| "(not set)".to_string()));
  println!("Validation:       {}", if settings.validation_enabled { "on" } else { "off" });
  println!("Model:            {}", config.model);
  println!("API base URL:     {}", config.api_base_url);
  println!("Catalog URL:      {}", config.catalog_url);
  println!("Editor URL:       {}", config.editor_url);
  println!("Validation URL:   {}", config.validation_url);
  Ok(())
}

pub fn set_key(key: &str) -> Result<()> {
  let store = store();
  let mut settings = store.load().context("Failed to load settings")?;
  settings.set_api_key(key);
  store.save(&settings).context("Failed to save settings")?;

  herald::success!("API key saved successfully!");
  Ok(())
}

pub fn clear_key() -> Result<()> {
  let store = store();
  let mut settings = store.load().context("Failed to load settings")?;
  settings.clear_api_key();
  store.save(&settings).context("Failed to save settings")?;

  herald::success!("API key removed");
  Ok(())
}

pub fn set_validation(enabled: bool) -> Result<()> {
  let store = store();
  let mut settings = store.load().context("Failed to load settings")?;
  settings.set_validation_enabled(enabled);
  store.save(&settings).context("Failed to save settings")?;

  herald::success!(&format!("Validation turned {}", if enabled { "on" } else { "off" }));
  Ok(())
}
