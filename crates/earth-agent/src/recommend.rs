//! Dataset recommendation through the chat model.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::llm::{ChatClient, ChatRequest, LlmError};
use crate::matcher::AnalysisResult;

pub const SYSTEM_PROMPT: &str = "You are an expert in Earth Engine datasets. Given a task and potential \
datasets, recommend the best datasets for the task.

Consider:
1. Temporal coverage - select datasets that cover the time period needed
2. Spatial resolution - select appropriate resolution for the task
3. Data type - select datasets with bands/attributes needed for the task
4. Update frequency - select datasets that are most current for the task
5. Provider reliability - prioritize datasets from reliable sources

Return a JSON object with:
- \"selected_datasets\": Array of dataset objects with \"id\", \"title\", and \"reason\" (explanation for why this dataset is appropriate)
- \"browsing_process\": Detailed explanation of how you browsed through the catalog and evaluated datasets. Be specific about why certain datasets were considered and others rejected.
- \"dataset_comparisons\": Array of dataset comparison objects showing datasets you considered but didn't select, with \"id\" and \"reason_not_selected\"
- \"analysis\": Overall explanation of why these datasets are best for this task";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedDataset {
  pub id: String,
  pub title: String,
  pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetComparison {
  pub id: String,
  pub reason_not_selected: String,
}

/// The model's answer. Every field tolerates being absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
  pub selected_datasets: Vec<SelectedDataset>,
  pub browsing_process: Option<String>,
  pub dataset_comparisons: Vec<DatasetComparison>,
  pub analysis: Option<String>,
}

impl Recommendation {
  /// Parse model output leniently. Non-JSON output becomes the analysis text.
  pub fn parse(content: &str) -> Self {
    if let Ok(parsed) = serde_json::from_str::<Recommendation>(content) {
      return parsed;
    }

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
      if start < end {
        if let Ok(parsed) = serde_json::from_str::<Recommendation>(&content[start..=end]) {
          debug!("recovered recommendation JSON embedded in surrounding text");
          return parsed;
        }
      }
    }

    warn!("recommendation was not JSON; keeping it as free-form analysis");
    Self { analysis: Some(content.trim().to_string()), ..Self::default() }
  }

  pub fn selected_ids(&self) -> Vec<&str> {
    self.selected_datasets.iter().map(|d| d.id.as_str()).collect()
  }

  /// Human-readable summary shown before the generated code
  pub fn report(&self) -> String {
    let mut out = String::from("DATASET BROWSING PROCESS:\n");
    out.push_str(self.browsing_process.as_deref().unwrap_or("No browsing process provided."));

    out.push_str("\n\nRECOMMENDED DATASETS:\n");
    for (index, dataset) in self.selected_datasets.iter().enumerate() {
      let _ = writeln!(out, "{}. {} ({})\n   - {}", index + 1, dataset.id, dataset.title, dataset.reason);
    }

    out.push_str("\nANALYSIS:\n");
    out.push_str(self.analysis.as_deref().unwrap_or("No analysis provided."));

    if !self.dataset_comparisons.is_empty() {
      out.push_str("\n\nCONSIDERED BUT NOT SELECTED:\n");
      for comparison in &self.dataset_comparisons {
        let _ = writeln!(out, "- {}: {}", comparison.id, comparison.reason_not_selected);
      }
    }

    out
  }
}

fn pretty(value: &impl Serialize) -> String {
  serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

pub fn user_prompt(task: &str, analysis: &AnalysisResult) -> String {
  format!(
    "Recommend the best Earth Engine datasets for this task: \"{task}\".

I've analyzed the full Earth Engine catalog ({total} datasets) and found these potentially relevant datasets based on the task keywords ({keywords}):

RELEVANT DATASETS:
{relevant}

ADDITIONAL IMPORTANT DATASETS that might be relevant:
{additional}

Please review these datasets and recommend the best ones for this specific task. IMPORTANT: Be diverse in your recommendations and don't always default to the same datasets. Show your detailed comparison process, explaining which datasets you considered but decided against and why.",
    total = analysis.total_datasets_available,
    keywords = analysis.detected_keywords.join(", "),
    relevant = pretty(&analysis.relevant_datasets),
    additional = pretty(&analysis.additional_important_datasets),
  )
}

pub fn build_request(config: &AgentConfig, task: &str, analysis: &AnalysisResult) -> ChatRequest {
  ChatRequest::new(&config.model, SYSTEM_PROMPT, user_prompt(task, analysis))
    .json_response()
    .temperature(config.recommend_temperature)
    .max_tokens(config.recommend_max_tokens)
}

/// Ask the model to pick datasets for `task` from the matcher's candidates
pub async fn recommend(
  client: &dyn ChatClient,
  config: &AgentConfig,
  api_key: &str,
  task: &str,
  analysis: &AnalysisResult,
) -> Result<Recommendation, LlmError> {
  let content = client.complete(api_key, build_request(config, task, analysis)).await?;
  Ok(Recommendation::parse(&content))
}
