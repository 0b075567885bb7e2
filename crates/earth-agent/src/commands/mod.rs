//! Handlers behind the `earth-agent` subcommands

pub mod config;
pub mod datasets;
pub mod extract;
pub mod generate;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::config::AgentConfig;

/// Read code from a file, or from stdin when the path is absent or `-`
pub fn read_input(path: Option<&Path>) -> Result<String> {
  match path {
    Some(path) if path != Path::new("-") => {
      std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
    _ => {
      let mut buffer = String::new();
      std::io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
      Ok(buffer)
    }
  }
}

pub fn load_config() -> Result<AgentConfig> {
  AgentConfig::load().context("Failed to load configuration")
}
