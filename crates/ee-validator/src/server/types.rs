//! Request and response bodies for the validation service

use serde::{Deserialize, Serialize};

/// Body of `POST /validate`
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateRequest {
  /// The JavaScript to validate
  #[serde(default)]
  pub code: Option<String>,
}

/// Response of `POST /validate`
///
/// On success `code` holds the validated code, on failure `error` holds the
/// reason. Exactly one of the two is set. This service always sends `valid`,
/// other implementations may only send `code` or `error`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidateResponse {
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub valid: Option<bool>,

  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub code: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub error: Option<String>,
}

impl ValidateResponse {
  pub fn valid(code: String) -> Self {
    Self { valid: Some(true), code: Some(code), error: None }
  }

  pub fn invalid(error: impl Into<String>) -> Self {
    Self { valid: Some(false), code: None, error: Some(error.into()) }
  }
}

/// Response of `GET /status`
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  pub syntax_check: bool,
}
