//! Service startup

use anyhow::{Context, Result};
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

use crate::rules::Validator;
use crate::server::routing::create_router;

/// Bind `addr` and serve until the process is stopped
pub async fn start_server(addr: SocketAddr, validator: Validator) -> Result<()> {
  let app = create_router(Arc::new(validator));

  let listener =
    TcpListener::bind(addr).await.with_context(|| format!("Failed to bind validation service to {addr}"))?;
  herald::info!(&format!("Validation service listening on http://{addr}/validate"));

  serve(listener, app).await.context("Validation service stopped unexpectedly")?;
  Ok(())
}
