//! Similar-products service.
//!
//! Answers `GET /product/{id}/similar` by composing two calls against a slow,
//! failure-prone product catalog behind a resilience stack.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌───────────────────────────────────────────────────────────┐
//!                │                  SIMILAR-PRODUCTS SERVICE                  │
//!                │                                                            │
//!   Request      │  ┌──────────┐    ┌────────────┐    ┌───────────────────┐   │
//!   ─────────────┼─▶│   http   │───▶│ aggregator │───▶│  ids breaker      │───┼──▶ /similarids
//!                │  │  server  │    │  service   │    └───────────────────┘   │
//!                │  └──────────┘    │            │    ┌───────────────────┐   │
//!   Response     │                  │            │───▶│ batch orchestrator│   │
//!   ◀────────────┼──────────────────│            │    │ → detail breaker  │───┼──▶ /product/{id}
//!                │                  └────────────┘    └───────────────────┘   │
//!                │                                                            │
//!                │  upstream client: cache → retry executor → reqwest         │
//!                │  cross-cutting: config, observability, lifecycle, admin    │
//!                └───────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;

use similar_products::config::{self, CONFIG_PATH_ENV};
use similar_products::http::HttpServer;
use similar_products::lifecycle::{build_service, signals, Shutdown};
use similar_products::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "similar-products", version)]
#[command(about = "Similar products aggregation service", long_about = None)]
struct Args {
    /// TOML configuration file (falls back to $SIMILAR_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let path = args
        .config
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    let config = match config::load(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        "similar-products starting"
    );

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: config::ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = build_service(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config, service);
    server.run(listener, shutdown.subscribe()).await?;

    Ok(())
}
