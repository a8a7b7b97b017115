//! Form Relay
//!
//! Receives contact, compliance checkup and quiz submissions from the
//! website and relays them as HTML email.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                 ┌──────────────────────────────────────────────┐
//!     ────────────────────────┼─▶ http (CORS, body limit, rate limit)        │
//!                             │      │                                       │
//!                             │      ▼                                       │
//!                             │   pipeline: validate → normalize → render    │
//!                             │      │                                       │
//!                             │      ▼                                       │
//!                             │   mail: token (cached) → sendMail ───────────┼──▶ Graph API
//!                             └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use form_relay::config::loader::load_config;
use form_relay::config::RelayConfig;
use form_relay::lifecycle::{build_pipeline, wait_for_signal, Shutdown};
use form_relay::observability::{logging, metrics};
use form_relay::HttpServer;

#[derive(Parser)]
#[command(name = "form-relay")]
#[command(about = "Relays website form submissions as email", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!("form-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit = config.rate_limit.enabled,
        production = config.cors.production,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pipeline = build_pipeline(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "Shutdown signal received");
        trigger.trigger();
    });

    HttpServer::new(config, pipeline).run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
