use anyhow::{Context, Result};
use std::path::PathBuf;

use super::load_config;
use super::run::{deploy_code, BrowserOptions};
use crate::pipeline::EarthAgent;
use crate::settings::{resolve_api_key, FileSettingsStore, SettingsStore};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
  pub prompt: String,
  /// Key entered for this run; a usable stored key still takes precedence
  pub api_key: Option<String>,
  pub direct: bool,
  pub output: Option<PathBuf>,
  pub run: bool,
  pub browser: BrowserOptions,
}

pub async fn generate(options: GenerateOptions) -> Result<()> {
  let config = load_config()?;
  let settings = FileSettingsStore::default_location().load().context("Failed to load settings")?;
  let api_key = resolve_api_key(&settings, options.api_key.as_deref());

  let mut agent = EarthAgent::from_config(config.clone())?;
  if settings.validation_enabled {
    agent = agent.with_validation();
  }

  let output = if options.direct {
    agent.run_direct(&options.prompt, api_key.as_deref()).await?
  } else {
    agent.run(&options.prompt, api_key.as_deref()).await?
  };

  match &options.output {
    Some(path) => {
      std::fs::write(path, format!("{}\n", output.code))
        .with_context(|| format!("Failed to write {}", path.display()))?;
      herald::success!(&format!("Code written to {}", path.display()));
    }
    None => println!("{}", output.code),
  }

  if options.run {
    deploy_code(&config, &output.code, &options.browser).await?;
  }

  Ok(())
}
