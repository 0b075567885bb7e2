//! Browser automation over the Chrome DevTools protocol.
//!
//! Everything that touches the Earth Engine page goes through [`PageDriver`],
//! which only knows how to evaluate a script and report the tab URL. The
//! injection and run-button probes are plain JavaScript built on top of it.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum BrowserError {
  #[error("Failed to connect to browser at {url}: {message}")]
  Connect { url: String, message: String },

  #[error("Failed to launch browser: {0}")]
  Launch(String),

  #[error("Failed to open {url}: {message}")]
  Navigation { url: String, message: String },

  #[error("Script evaluation failed: {0}")]
  Script(String),

  #[error("Browser protocol error: {0}")]
  Protocol(String),
}

/// The minimal page surface the agent needs
#[async_trait]
pub trait PageDriver: Send + Sync {
  /// Evaluate a JavaScript expression and return its JSON value
  async fn evaluate(&self, script: &str) -> Result<Value, BrowserError>;

  async fn url(&self) -> Result<Option<String>, BrowserError>;
}

/// Encode a value as a JavaScript literal for embedding in a probe script
pub fn js_literal(value: &impl Serialize) -> Result<String, BrowserError> {
  serde_json::to_string(value).map_err(|e| BrowserError::Script(e.to_string()))
}

/// A tab showing the code editor
pub struct EditorTab {
  pub page: Box<dyn PageDriver>,
  /// True when an already open editor tab was reused
  pub reused: bool,
}

/// Something that can produce an editor tab
#[async_trait]
pub trait EditorHost: Send + Sync {
  async fn open_editor(&self, editor_url: &str) -> Result<EditorTab, BrowserError>;
}

pub struct CdpPage {
  page: Page,
}

#[async_trait]
impl PageDriver for CdpPage {
  async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
    self
      .page
      .evaluate(script)
      .await
      .map_err(|e| BrowserError::Script(e.to_string()))?
      .into_value::<Value>()
      .map_err(|e| BrowserError::Script(e.to_string()))
  }

  async fn url(&self) -> Result<Option<String>, BrowserError> {
    self.page.url().await.map_err(|e| BrowserError::Protocol(e.to_string()))
  }
}

/// A DevTools session with a running or launched Chromium
pub struct CdpSession {
  browser: Browser,
  handler: JoinHandle<()>,
  launched: bool,
}

impl CdpSession {
  fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
      while let Some(event) = handler.next().await {
        if let Err(e) = event {
          debug!(error = %e, "devtools handler stopped");
          break;
        }
      }
    })
  }

  /// Attach to a browser started with `--remote-debugging-port`
  pub async fn connect(debug_url: &str) -> Result<Self, BrowserError> {
    let parsed = Url::parse(debug_url)
      .map_err(|e| BrowserError::Connect { url: debug_url.to_string(), message: e.to_string() })?;
    if !matches!(parsed.scheme(), "http" | "https" | "ws" | "wss") {
      return Err(BrowserError::Connect {
        url: debug_url.to_string(),
        message: format!("unsupported scheme '{}'", parsed.scheme()),
      });
    }

    let (browser, handler) = Browser::connect(debug_url)
      .await
      .map_err(|e| BrowserError::Connect { url: debug_url.to_string(), message: e.to_string() })?;

    info!(url = %debug_url, "connected to browser");
    Ok(Self { browser, handler: Self::spawn_handler(handler), launched: false })
  }

  /// Start a new Chromium instance
  pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
    let builder = BrowserConfig::builder();
    let builder = if headless { builder } else { builder.with_head() };
    let config = builder.build().map_err(BrowserError::Launch)?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| BrowserError::Launch(e.to_string()))?;

    info!(headless, "launched browser");
    Ok(Self { browser, handler: Self::spawn_handler(handler), launched: true })
  }

  async fn find_editor_page(&self, editor_url: &str) -> Result<Option<Page>, BrowserError> {
    let pages = self.browser.pages().await.map_err(|e| BrowserError::Protocol(e.to_string()))?;

    for page in pages {
      match page.url().await {
        Ok(Some(url)) if url.starts_with(editor_url) => return Ok(Some(page)),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not read tab url"),
      }
    }

    Ok(None)
  }

  /// True when this session started the browser itself
  pub fn launched(&self) -> bool {
    self.launched
  }

  /// Shut down a launched browser; an attached one is only detached from
  pub async fn close(mut self) {
    if self.launched {
      if let Err(e) = self.browser.close().await {
        debug!(error = %e, "browser close failed");
      }
    }
    self.handler.abort();
  }
}

#[async_trait]
impl EditorHost for CdpSession {
  async fn open_editor(&self, editor_url: &str) -> Result<EditorTab, BrowserError> {
    if let Some(page) = self.find_editor_page(editor_url).await? {
      if let Err(e) = page.bring_to_front().await {
        debug!(error = %e, "could not focus editor tab");
      }
      info!("reusing open Earth Engine editor tab");
      return Ok(EditorTab { page: Box::new(CdpPage { page }), reused: true });
    }

    let page = self
      .browser
      .new_page(editor_url)
      .await
      .map_err(|e| BrowserError::Navigation { url: editor_url.to_string(), message: e.to_string() })?;

    info!(url = %editor_url, "opened Earth Engine editor tab");
    Ok(EditorTab { page: Box::new(CdpPage { page }), reused: false })
  }
}
