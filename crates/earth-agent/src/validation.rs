//! Client for the optional validation service.
//!
//! Validation never blocks the pipeline: an invalid verdict is reported as a
//! warning and the code is kept. When the service cannot be reached the same
//! rules are applied in-process.

use ee_validator::server::types::{ValidateRequest, ValidateResponse};
use ee_validator::Validator;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ValidationError {
  #[error("Validation service unreachable at {url}: {message}")]
  Unreachable { url: String, message: String },

  #[error("Validation service returned an unexpected response: {0}")]
  Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
  Service,
  Local,
}

impl std::fmt::Display for VerdictSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Service => f.write_str("validation service"),
      Self::Local => f.write_str("local rules"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
  /// Code to use from here on; the service may hand back a normalised copy
  pub code: String,
  pub error: Option<String>,
  pub source: VerdictSource,
}

impl ValidationReport {
  pub fn is_valid(&self) -> bool {
    self.error.is_none()
  }
}

pub struct ValidationClient {
  http: reqwest::Client,
  url: String,
  local: Validator,
}

impl ValidationClient {
  pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
    Self { http, url: url.into(), local: Validator::default() }
  }

  pub fn with_local_validator(mut self, local: Validator) -> Self {
    self.local = local;
    self
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  async fn query_service(&self, code: &str) -> Result<ValidationReport, ValidationError> {
    let unreachable = |e: reqwest::Error| ValidationError::Unreachable { url: self.url.clone(), message: e.to_string() };

    let response = self
      .http
      .post(&self.url)
      .json(&ValidateRequest { code: Some(code.to_string()) })
      .send()
      .await
      .map_err(unreachable)?;

    let status = response.status();
    let body = response.text().await.map_err(unreachable)?;

    let verdict = serde_json::from_str::<ValidateResponse>(&body)
      .map_err(|e| ValidationError::Malformed(format!("HTTP {status}: {e}")))?;

    service_report(code, verdict).ok_or_else(|| ValidationError::Malformed(format!("HTTP {status}: {body}")))
  }

  async fn validate_locally(&self, code: &str) -> ValidationReport {
    match self.local.validate(code).await {
      Ok(code) => ValidationReport { code, error: None, source: VerdictSource::Local },
      Err(violation) => ValidationReport {
        code: code.to_string(),
        error: Some(format!("Earth Engine code validation failed: {violation}")),
        source: VerdictSource::Local,
      },
    }
  }

  /// Validate through the service, falling back to the local rules
  pub async fn validate(&self, code: &str) -> ValidationReport {
    match self.query_service(code).await {
      Ok(report) => {
        debug!(url = %self.url, valid = report.is_valid(), "validation service answered");
        report
      }
      Err(e) => {
        warn!(error = %e, "validation service unavailable, using local rules");
        self.validate_locally(code).await
      }
    }
  }
}

/// Read a service verdict; `error` or `valid: false` rejects, `code` or
/// `valid: true` accepts, anything else is not a verdict
fn service_report(code: &str, verdict: ValidateResponse) -> Option<ValidationReport> {
  match verdict {
    ValidateResponse { error: Some(error), .. } => Some(ValidationReport {
      code: code.to_string(),
      error: Some(error),
      source: VerdictSource::Service,
    }),
    ValidateResponse { valid: Some(false), .. } => Some(ValidationReport {
      code: code.to_string(),
      error: Some("Validation failed".to_string()),
      source: VerdictSource::Service,
    }),
    ValidateResponse { code: Some(returned), .. } => {
      Some(ValidationReport { code: returned, error: None, source: VerdictSource::Service })
    }
    ValidateResponse { valid: Some(true), .. } => {
      Some(ValidationReport { code: code.to_string(), error: None, source: VerdictSource::Service })
    }
    ValidateResponse { .. } => None,
  }
}
