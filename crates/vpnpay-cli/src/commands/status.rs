//! `vpnpay status`: query a running node.

use clap::Args;
use serde::Deserialize;

use crate::client::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    sessions: usize,
    active_sessions: usize,
    escrow: String,
    refund_timeout_secs: u64,
    min_collateral: u64,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let status: StatusResponse = NodeClient::new(&args.endpoint).get("/api/v1/status").await?;

    println!("Node Status:");
    println!("  Endpoint:        {}", args.endpoint);
    println!("  Version:         {}", status.version);
    println!("  Uptime:          {}s", status.uptime_secs);
    println!("  Sessions:        {} ({} active)", status.sessions, status.active_sessions);
    println!("  Escrow:          {}", status.escrow);
    println!("  Refund timeout:  {}s", status.refund_timeout_secs);
    println!("  Min collateral:  {}", status.min_collateral);
    Ok(())
}
