//! Regex redirect server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ ┌────────────┐   ┌───────────────────┐   ┌──────────────┐
//!                     │ request id │──▶│ redirect rule 1..n │──▶│ next handler │──▶ Upstream
//!                     │  + trace   │   └─────────┬─────────┘   └──────────────┘
//!                     └────────────┘             │
//!     ◀──────────────────────────────────────────┘ 301/302/307/308 or 502
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use regex_redirect::config::loader::load_config;
use regex_redirect::observability::{logging, metrics};
use regex_redirect::{HttpServer, ProxyConfig, Shutdown};

#[derive(Parser)]
#[command(name = "regex-redirect")]
#[command(about = "HTTP server applying regex redirects in front of an upstream", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        redirects = config.redirects.len(),
        upstream = ?config.upstream.as_ref().map(|u| u.address.as_str()),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        signal.trigger_on_ctrl_c().await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
