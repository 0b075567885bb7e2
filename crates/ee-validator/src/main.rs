//! Earth Engine validation service
//!
//! Localhost endpoint the `earth-agent` CLI posts generated code to.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use ee_validator::server::startup::start_server;
use ee_validator::Validator;

#[derive(Parser)]
#[command(name = "ee-validator")]
#[command(about = "Validation service for generated Earth Engine JavaScript")]
#[command(version)]
struct Args {
  /// Server bind address
  #[arg(long, default_value = "127.0.0.1:5000")]
  bind: SocketAddr,

  /// Skip the `node --check` syntax pass
  #[arg(long)]
  no_syntax_check: bool,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if args.verbose {
      EnvFilter::new("ee_validator=debug,tower_http=debug,info")
    } else {
      EnvFilter::new("ee_validator=info,warn")
    }
  });
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  herald::info!(&format!("Starting ee-validator v{}", env!("CARGO_PKG_VERSION")));
  start_server(args.bind, Validator::new(!args.no_syntax_check)).await
}
