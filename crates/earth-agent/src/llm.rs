//! Chat completion client.
//!
//! Recommendation and code generation both talk to an OpenAI-compatible
//! `/chat/completions` endpoint. The [`ChatClient`] trait is the seam the
//! pipeline depends on so tests can script model replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LlmError {
  #[error("Network error: {0}")]
  Network(String),

  #[error("OpenAI API error: {0}")]
  Api(String),

  #[error("Failed to parse OpenAI response: {0}")]
  Parse(String),

  #[error("OpenAI returned no choices")]
  EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub role: Role,
  pub content: String,
}

impl Message {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
  JsonObject,
  Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
  pub model: String,
  pub messages: Vec<Message>,
  pub temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
  pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
    Self {
      model: model.into(),
      messages: vec![Message::system(system), Message::user(user)],
      temperature: 0.7,
      max_tokens: None,
      response_format: None,
    }
  }

  pub fn temperature(mut self, temperature: f32) -> Self {
    self.temperature = temperature;
    self
  }

  pub fn max_tokens(mut self, max_tokens: u32) -> Self {
    self.max_tokens = Some(max_tokens);
    self
  }

  pub fn json_response(mut self) -> Self {
    self.response_format = Some(ResponseFormat::JsonObject);
    self
  }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
  message: Option<String>,
}

/// Anything that can answer a chat completion request with text
#[async_trait]
pub trait ChatClient: Send + Sync {
  async fn complete(&self, api_key: &str, request: ChatRequest) -> Result<String, LlmError>;
}

/// Client for an OpenAI-compatible API
#[derive(Clone)]
pub struct OpenAiClient {
  http: reqwest::Client,
  base_url: String,
}

impl OpenAiClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
    let http = reqwest::Client::builder().timeout(timeout).build().map_err(|e| LlmError::Network(e.to_string()))?;
    Ok(Self::with_http_client(base_url, http))
  }

  pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Self { http, base_url }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }
}

/// Pull the human-readable message out of an error body, if it has one
fn api_error_message(body: &str) -> String {
  serde_json::from_str::<ApiErrorBody>(body)
    .ok()
    .and_then(|b| b.error)
    .and_then(|e| e.message)
    .unwrap_or_else(|| "Unknown error".to_string())
}

#[async_trait]
impl ChatClient for OpenAiClient {
  async fn complete(&self, api_key: &str, request: ChatRequest) -> Result<String, LlmError> {
    let start = std::time::Instant::now();

    let response = self
      .http
      .post(format!("{}/chat/completions", self.base_url))
      .bearer_auth(api_key)
      .json(&request)
      .send()
      .await
      .map_err(|e| {
        warn!(error = %e, "OpenAI request failed");
        LlmError::Network(e.to_string())
      })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;

    if !status.is_success() {
      let message = api_error_message(&body);
      warn!(status = %status, error = %message, "OpenAI API error");
      return Err(LlmError::Api(message));
    }

    let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    debug!(
      model = %request.model,
      elapsed_ms = start.elapsed().as_millis() as u64,
      "chat completion finished"
    );

    let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
    Ok(choice.message.content.unwrap_or_default().trim().to_string())
  }
}
