use anyhow::Result;
use std::future::Future;
use std::path::Path;

use super::{load_config, read_input};
use crate::browser::CdpSession;
use crate::config::AgentConfig;
use crate::pipeline::{deploy, AgentError, HeraldProgress};
use crate::run_trigger::RunOutcome;

/// Where to find a browser
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
  /// DevTools URL of an already running Chromium; a new one is launched when absent
  pub debug_url: Option<String>,
  pub headless: bool,
}

pub async fn run(path: Option<&Path>, browser: &BrowserOptions) -> Result<()> {
  let config = load_config()?;
  let code = read_input(path)?;
  deploy_code(&config, code.trim(), browser).await
}

/// Inject `code` into the editor and press Run, printing manual steps on failure
pub async fn deploy_code(config: &AgentConfig, code: &str, options: &BrowserOptions) -> Result<()> {
  let session = match &options.debug_url {
    Some(url) => CdpSession::connect(url).await?,
    None => CdpSession::launch(options.headless).await?,
  };

  let result = deploy(&session, code, config, &HeraldProgress).await;

  match &result {
    Ok(report) => {
      herald::success!(&format!("Code injected via {}", report.injection.strategy));
      if report.run == RunOutcome::Clicked {
        herald::success!("Run button clicked");
      }
      if session.launched() && !options.headless {
        hold_open(tokio::signal::ctrl_c()).await;
      }
    }
    Err(AgentError::Injection(_)) | Err(AgentError::EditorTimeout { .. }) => {
      herald::fallback!("Copy the code below and paste it into the Earth Engine editor manually, then press Run.");
      println!("{code}");
    }
    Err(_) => {}
  }

  session.close().await;
  result.map(|_| ()).map_err(Into::into)
}

/// Keep a launched browser open until `signal` fires; false when the signal
/// could not be awaited
async fn hold_open(signal: impl Future<Output = std::io::Result<()>>) -> bool {
  herald::info!("Press Ctrl-C to close the browser");
  match signal.await {
    Ok(()) => true,
    Err(e) => {
      herald::warn!(&format!("Could not wait for Ctrl-C: {e}"));
      false
    }
  }
}
