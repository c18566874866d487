//! Feedhook - push-based webhook notification broker
//!
//! Receives node events over a length-prefixed TCP socket and fans them out
//! to subscribed webhook endpoints with per-subscription filtering, retries
//! and health tracking.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (TCP on 127.0.0.1:8040)
//! feedhook
//!
//! # Run with a config file
//! feedhook --config configs/feedhook.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedhook_config::Config;
use feedhook_pipeline::{DeliveryOptions, Router};
use feedhook_sources::{TcpIngress, TcpIngressConfig};
use feedhook_store::MemoryRepository;

/// Feedhook - push-based webhook notification broker
#[derive(Parser, Debug)]
#[command(name = "feedhook")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "config file not found: {}",
                    path.display()
                ));
            }
            Config::from_file(path).context("failed to load configuration")?
        }
        None => {
            let default_path = PathBuf::from("feedhook.toml");
            if default_path.exists() {
                Config::from_file(&default_path).context("failed to load configuration")?
            } else {
                Config::default()
            }
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    init_logging(level)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "feedhook starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("feedhook shutdown complete");
    Ok(())
}

/// Wire the listener, queue and router together and run until shutdown
async fn run_server(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let repo = Arc::new(MemoryRepository::new());

    // Shared event queue; ingress readers block when it is full
    let (tx, rx) = mpsc::channel(config.listener.queue_capacity);

    let ingress = TcpIngress::new(
        TcpIngressConfig {
            address: config.listener.address.clone(),
            port: config.listener.port,
            ..TcpIngressConfig::default()
        },
        tx,
    );

    let options = DeliveryOptions {
        max_attempts: config.delivery.max_attempts,
        retry_interval: config.delivery.retry_interval,
        holdoff: config.delivery.holdoff,
        max_failures: config.delivery.max_failures,
        request_timeout: config.delivery.request_timeout,
    };

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    let router = Router::new(
        Arc::clone(&repo) as Arc<dyn feedhook_store::Repository>,
        client,
        options,
    );
    let router_handle = tokio::spawn(router.run(rx));

    let ingress_cancel = cancel.clone();
    let ingress_handle = tokio::spawn(async move { ingress.run(ingress_cancel).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        result = ingress_handle => {
            match result {
                Ok(Ok(())) => info!("ingress stopped"),
                Ok(Err(e)) => return Err(e).context("ingress failed"),
                Err(e) => return Err(e).context("ingress task panicked"),
            }
        }
    }

    // Stop accepting and reading; dropping the last producer ends the router
    cancel.cancel();

    router_handle.await.context("router task panicked")?;

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
