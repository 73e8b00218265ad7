//! vpnpay node: entry point.
//!
//! Starts the ledger host with configuration from a TOML file or defaults.

// Accessors used by tests.
#![allow(dead_code)]

mod api;
mod commands;
mod config;
mod node;
mod state;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::VpnpayConfig;
use node::VpnpayNode;

/// vpnpay ledger node
#[derive(Parser, Debug)]
#[command(name = "vpnpay-node", version, about = "vpnpay ledger node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "vpnpay.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if args.init {
        VpnpayConfig::default()
    } else {
        VpnpayConfig::load(&args.config)?
    };

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);

    if args.init {
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    tracing::info!("vpnpay node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = VpnpayNode::new(config)?;
    node.start().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "node event loop error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("vpnpay node exited cleanly");
    Ok(())
}
