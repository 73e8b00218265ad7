//! vpnpay CLI: open payment sessions, issue vouchers, and talk to a node.
//!
//! Subcommands: init, status, open, voucher, settle, refund, session.

mod client;
mod commands;
mod wallet;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// vpnpay: pay-as-you-go sessions settled with signed vouchers.
#[derive(Parser, Debug)]
#[command(name = "vpnpay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default node configuration.
    Init(commands::init::InitArgs),
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// Open a session and store its key in the wallet.
    Open(commands::open::OpenArgs),
    /// Issue the next voucher for a wallet session.
    Voucher(commands::voucher::VoucherArgs),
    /// Submit a voucher file to the node.
    Settle(commands::settle::SettleArgs),
    /// Refund a session's remainder after its timeout.
    Refund(commands::refund::RefundArgs),
    /// Show a session entry.
    Session(commands::session::SessionArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Open(args) => commands::open::run(args).await,
        Commands::Voucher(args) => commands::voucher::run(args),
        Commands::Settle(args) => commands::settle::run(args).await,
        Commands::Refund(args) => commands::refund::run(args).await,
        Commands::Session(args) => commands::session::run(args).await,
    }
}
