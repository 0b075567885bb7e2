//! Earth Engine code generation prompts and calls.

use crate::config::AgentConfig;
use crate::llm::{ChatClient, ChatRequest, LlmError};
use crate::recommend::Recommendation;

pub const AGENT_SYSTEM_PROMPT: &str = "You are an expert in Google Earth Engine programming. Generate \
efficient, well-commented JavaScript code for the Earth Engine Code Editor. Focus on practical \
implementation using the recommended datasets, with proper error handling and visualization.";

pub const DIRECT_SYSTEM_PROMPT: &str = "You are an expert in Google Earth Engine programming. Generate \
efficient, well-commented JavaScript code for the Earth Engine Code Editor. ONLY output valid JavaScript \
code with no explanations before or after. Do NOT include markdown formatting, headers, or any text that \
is not part of the code itself.";

pub fn agent_user_prompt(task: &str, recommendation: &Recommendation) -> String {
  let datasets = serde_json::to_string(&recommendation.selected_datasets).unwrap_or_else(|_| "[]".to_string());
  format!(
    "Create Google Earth Engine JavaScript code for this task: \"{task}\". Use these specific datasets: \
     {datasets}. Analysis provided: {}",
    recommendation.analysis.as_deref().unwrap_or_default()
  )
}

pub fn direct_user_prompt(task: &str) -> String {
  format!("Generate Earth Engine JavaScript code for: {task}. Return ONLY the code with no explanations before or after.")
}

pub fn agent_request(config: &AgentConfig, task: &str, recommendation: &Recommendation) -> ChatRequest {
  ChatRequest::new(&config.model, AGENT_SYSTEM_PROMPT, agent_user_prompt(task, recommendation))
    .temperature(config.temperature)
    .max_tokens(config.codegen_max_tokens)
}

pub fn direct_request(config: &AgentConfig, task: &str) -> ChatRequest {
  ChatRequest::new(&config.model, DIRECT_SYSTEM_PROMPT, direct_user_prompt(task)).temperature(config.direct_temperature)
}

/// Generate code grounded on the recommended datasets. Returns raw model text.
pub async fn generate(
  client: &dyn ChatClient,
  config: &AgentConfig,
  api_key: &str,
  task: &str,
  recommendation: &Recommendation,
) -> Result<String, LlmError> {
  client.complete(api_key, agent_request(config, task, recommendation)).await
}

/// Single-call generation without catalog lookup or recommendation
pub async fn generate_direct(
  client: &dyn ChatClient,
  config: &AgentConfig,
  api_key: &str,
  task: &str,
) -> Result<String, LlmError> {
  client.complete(api_key, direct_request(config, task)).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::recommend::SelectedDataset;

  #[test]
  fn test_agent_request_embeds_selection_and_analysis() {
    let recommendation = Recommendation {
      selected_datasets: vec![SelectedDataset {
        id: "COPERNICUS/S2_SR".into(),
        title: "Sentinel-2".into(),
        reason: "fine".into(),
      }],
      analysis: Some("Sentinel-2 has 10m bands.".into()),
      ..Recommendation::default()
    };

    let request = agent_request(&AgentConfig::default(), "NDVI over Paris", &recommendation);

    assert_eq!(request.temperature, 0.3);
    assert_eq!(request.max_tokens, Some(2048));
    assert!(request.response_format.is_none());
    assert_eq!(
      request.messages[1].content,
      "Create Google Earth Engine JavaScript code for this task: \"NDVI over Paris\". Use these specific \
       datasets: [{\"id\":\"COPERNICUS/S2_SR\",\"title\":\"Sentinel-2\",\"reason\":\"fine\"}]. Analysis \
       provided: Sentinel-2 has 10m bands."
    );
  }

  #[test]
  fn test_direct_request_is_strict_and_cooler() {
    let request = direct_request(&AgentConfig::default(), "water mask");

    assert_eq!(request.temperature, 0.2);
    assert!(request.max_tokens.is_none());
    assert!(request.messages[0].content.contains("ONLY output valid JavaScript"));
    assert!(request.messages[1].content.starts_with("Generate Earth Engine JavaScript code for: water mask."));
  }
}
