//! Endpoint handlers

use axum::{body::Bytes, extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::rules::Validator;
use crate::server::types::{StatusResponse, ValidateRequest, ValidateResponse};

/// POST /validate - Validate Earth Engine JavaScript
///
/// The body is parsed by hand so that a missing or malformed payload gets the
/// same `{error}` shape as a failed validation instead of axum's rejection text.
pub async fn validate(
  State(validator): State<Arc<Validator>>,
  body: Bytes,
) -> (StatusCode, Json<ValidateResponse>) {
  let code = serde_json::from_slice::<ValidateRequest>(&body).ok().and_then(|request| request.code);

  let Some(code) = code else {
    warn!("validate called without code");
    return (StatusCode::BAD_REQUEST, Json(ValidateResponse::invalid("No code provided")));
  };

  match validator.validate(&code).await {
    Ok(code) => {
      info!(bytes = code.len(), "code validated");
      (StatusCode::OK, Json(ValidateResponse::valid(code)))
    }
    Err(violation) => {
      warn!(%violation, "code rejected");
      let message = format!("Earth Engine code validation failed: {violation}");
      (StatusCode::BAD_REQUEST, Json(ValidateResponse::invalid(message)))
    }
  }
}

/// GET /status - Health check
pub async fn status(State(validator): State<Arc<Validator>>) -> Json<StatusResponse> {
  Json(StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    syntax_check: validator.syntax_check_enabled(),
  })
}
