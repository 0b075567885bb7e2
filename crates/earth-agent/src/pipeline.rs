//! End-to-end orchestration: prompt to code, code to a running editor.
//!
//! Stages run strictly one after another; the first failure ends the run.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::browser::{BrowserError, EditorHost};
use crate::catalog::{fetch_catalog, CatalogError};
use crate::codegen;
use crate::config::AgentConfig;
use crate::extract::extract;
use crate::inject::{inject, InjectionError, InjectionReport};
use crate::llm::{ChatClient, LlmError, OpenAiClient};
use crate::matcher::{self, AnalysisResult};
use crate::poll::{wait_until, PollError};
use crate::recommend::{recommend, Recommendation};
use crate::run_trigger::{click_run, run_button_present, RunOutcome};
use crate::validation::{ValidationClient, ValidationReport};

#[derive(Error, Debug)]
pub enum AgentError {
  #[error("Please enter your OpenAI API key")]
  MissingApiKey,

  #[error("Please enter a task description")]
  EmptyPrompt,

  #[error(transparent)]
  Catalog(#[from] CatalogError),

  #[error("Error recommending datasets: {0}")]
  Recommend(#[source] LlmError),

  #[error("Error generating code: {0}")]
  Generate(#[source] LlmError),

  #[error(transparent)]
  Browser(#[from] BrowserError),

  #[error(transparent)]
  Injection(#[from] InjectionError),

  #[error("Timeout waiting for Earth Engine to initialize after {attempts} attempts. Please try again or run manually.")]
  EditorTimeout { attempts: u32 },

  #[error("Failed to build HTTP client: {0}")]
  Http(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  FetchingCatalog,
  AnalyzingDatasets,
  RecommendingDatasets,
  GeneratingCode,
}

impl Stage {
  pub const COUNT: usize = 4;

  pub fn index(self) -> usize {
    match self {
      Self::FetchingCatalog => 1,
      Self::AnalyzingDatasets => 2,
      Self::RecommendingDatasets => 3,
      Self::GeneratingCode => 4,
    }
  }

  pub fn message(self) -> &'static str {
    match self {
      Self::FetchingCatalog => "Fetching Earth Engine dataset catalog...",
      Self::AnalyzingDatasets => "Analyzing datasets for your task...",
      Self::RecommendingDatasets => "Recommending the best datasets for your task...",
      Self::GeneratingCode => "Generating Earth Engine code with selected datasets...",
    }
  }
}

/// Where the pipeline reports what it is doing
pub trait ProgressSink: Send + Sync {
  fn stage(&self, stage: Stage);
  fn report(&self, title: &str, body: &str);
  fn notice(&self, message: &str);
}

/// Writes progress to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct HeraldProgress;

impl ProgressSink for HeraldProgress {
  fn stage(&self, stage: Stage) {
    herald::step!(stage.index(), Stage::COUNT, stage.message());
  }

  fn report(&self, title: &str, body: &str) {
    herald::section(title, body);
  }

  fn notice(&self, message: &str) {
    herald::warn!(message);
  }
}

/// Everything a generation run produced
#[derive(Debug, Clone)]
pub struct AgentOutput {
  pub code: String,
  /// Model text before extraction
  pub raw: String,
  pub analysis: Option<AnalysisResult>,
  pub recommendation: Option<Recommendation>,
  pub validation: Option<ValidationReport>,
}

pub struct EarthAgent {
  config: AgentConfig,
  http: reqwest::Client,
  chat: Arc<dyn ChatClient>,
  progress: Arc<dyn ProgressSink>,
  validation: Option<ValidationClient>,
}

fn require_inputs<'a>(task: &str, api_key: Option<&'a str>) -> Result<&'a str, AgentError> {
  let api_key = api_key.map(str::trim).filter(|k| !k.is_empty()).ok_or(AgentError::MissingApiKey)?;
  if task.trim().is_empty() {
    return Err(AgentError::EmptyPrompt);
  }
  Ok(api_key)
}

impl EarthAgent {
  pub fn new(
    config: AgentConfig,
    http: reqwest::Client,
    chat: Arc<dyn ChatClient>,
    progress: Arc<dyn ProgressSink>,
  ) -> Self {
    Self { config, http, chat, progress, validation: None }
  }

  /// Agent wired to the configured OpenAI endpoint, reporting through herald
  pub fn from_config(config: AgentConfig) -> Result<Self, AgentError> {
    let http = reqwest::Client::builder()
      .timeout(config.request_timeout())
      .build()
      .map_err(|e| AgentError::Http(e.to_string()))?;
    let chat = OpenAiClient::with_http_client(&config.api_base_url, http.clone());
    Ok(Self::new(config, http, Arc::new(chat), Arc::new(HeraldProgress)))
  }

  /// Check generated code against the validation service before returning it
  pub fn with_validation(mut self) -> Self {
    self.validation = Some(ValidationClient::new(self.http.clone(), &self.config.validation_url));
    self
  }

  pub fn config(&self) -> &AgentConfig {
    &self.config
  }

  /// Catalog fetch and keyword matching only
  pub async fn analyze(&self, task: &str) -> Result<AnalysisResult, AgentError> {
    self.progress.stage(Stage::FetchingCatalog);
    let catalog = fetch_catalog(&self.http, &self.config.catalog_url).await?;

    self.progress.stage(Stage::AnalyzingDatasets);
    let analysis = matcher::analyze(task, &catalog);
    debug!(
      keywords = ?analysis.detected_keywords,
      candidates = analysis.total_potential_matches,
      "catalog analysed"
    );
    Ok(analysis)
  }

  /// Full agent run: catalog, matching, recommendation, generation, extraction
  pub async fn run(&self, task: &str, api_key: Option<&str>) -> Result<AgentOutput, AgentError> {
    let api_key = require_inputs(task, api_key)?;

    let analysis = self.analyze(task).await?;

    self.progress.stage(Stage::RecommendingDatasets);
    let recommendation = recommend(self.chat.as_ref(), &self.config, api_key, task, &analysis)
      .await
      .map_err(AgentError::Recommend)?;
    self.progress.report("Dataset recommendations", &recommendation.report());

    self.progress.stage(Stage::GeneratingCode);
    let raw = codegen::generate(self.chat.as_ref(), &self.config, api_key, task, &recommendation)
      .await
      .map_err(AgentError::Generate)?;

    let (code, validation) = self.finish(&raw).await;
    info!(bytes = code.len(), "code generated");

    Ok(AgentOutput { code, raw, analysis: Some(analysis), recommendation: Some(recommendation), validation })
  }

  /// One chat call with the strict code-only prompt
  pub async fn run_direct(&self, task: &str, api_key: Option<&str>) -> Result<AgentOutput, AgentError> {
    let api_key = require_inputs(task, api_key)?;

    self.progress.stage(Stage::GeneratingCode);
    let raw = codegen::generate_direct(self.chat.as_ref(), &self.config, api_key, task)
      .await
      .map_err(AgentError::Generate)?;

    let (code, validation) = self.finish(&raw).await;
    Ok(AgentOutput { code, raw, analysis: None, recommendation: None, validation })
  }

  async fn finish(&self, raw: &str) -> (String, Option<ValidationReport>) {
    let code = extract(raw);

    let Some(client) = &self.validation else {
      return (code, None);
    };

    let report = client.validate(&code).await;
    if let Some(error) = &report.error {
      self.progress.notice(&format!("Code may not be valid ({}): {error}", report.source));
    }
    (report.code.clone(), Some(report))
  }
}

/// What happened in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
  pub reused_tab: bool,
  /// Probe attempt on which the Run button appeared, for fresh tabs
  pub ready_after: Option<u32>,
  pub injection: InjectionReport,
  pub run: RunOutcome,
}

/// Open the editor, inject `code`, press Run
pub async fn deploy(
  host: &dyn EditorHost,
  code: &str,
  config: &AgentConfig,
  progress: &dyn ProgressSink,
) -> Result<DeployReport, AgentError> {
  if code.trim().is_empty() {
    return Err(InjectionError::EmptyCode.into());
  }

  let tab = host.open_editor(&config.editor_url).await?;
  let page = tab.page.as_ref();

  let ready_after = if tab.reused {
    None
  } else {
    let attempt = wait_until(&config.poll_policy(), |_| run_button_present(page)).await.map_err(|e| match e {
      PollError::Exhausted { attempts } => AgentError::EditorTimeout { attempts },
      PollError::Probe(e) => AgentError::Browser(e),
    })?;
    tokio::time::sleep(config.settle_delay()).await;
    Some(attempt)
  };

  let injection = inject(page, code).await?;

  let run = click_run(page).await?;
  if matches!(run, RunOutcome::NotFound { .. }) {
    progress.notice(
      "The code has been injected successfully, but you'll need to click the Run button manually.",
    );
  }

  Ok(DeployReport { reused_tab: tab.reused, ready_after, injection, run })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_require_inputs_checks_key_first() {
    assert!(matches!(require_inputs("", None), Err(AgentError::MissingApiKey)));
    assert!(matches!(require_inputs("ndvi", Some("   ")), Err(AgentError::MissingApiKey)));
    assert!(matches!(require_inputs("  ", Some("sk-1")), Err(AgentError::EmptyPrompt)));
    assert_eq!(require_inputs("ndvi", Some(" sk-1 ")).unwrap(), "sk-1");
  }

  #[test]
  fn test_stage_numbering() {
    let stages =
      [Stage::FetchingCatalog, Stage::AnalyzingDatasets, Stage::RecommendingDatasets, Stage::GeneratingCode];
    let indices: Vec<usize> = stages.iter().map(|s| s.index()).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert_eq!(Stage::COUNT, stages.len());
  }
}
