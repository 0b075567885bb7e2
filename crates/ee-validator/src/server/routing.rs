//! Axum router configuration

use axum::{
  routing::{get, post},
  Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::rules::Validator;
use crate::server::handlers;

/// Create the service router sharing one validator across requests
pub fn create_router(validator: Arc<Validator>) -> Router {
  Router::new()
    .route("/validate", post(handlers::validate))
    .route("/status", get(handlers::status))
    .with_state(validator)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
}
