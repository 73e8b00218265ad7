//! `vpnpay session`: show a session's ledger entry.

use clap::Args;
use vpnpay_core::SessionId;
use vpnpay_settlement::SessionLedgerEntry;

use crate::client::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Session id (hex).
    #[arg(short, long)]
    pub session: String,

    /// Print the raw JSON entry.
    #[arg(long)]
    pub json: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &SessionArgs) -> anyhow::Result<()> {
    let session_id = SessionId::from_hex(&args.session)?;
    let entry: SessionLedgerEntry = NodeClient::new(&args.endpoint)
        .get(&format!("/api/v1/sessions/{}", session_id))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    println!("Session {}", entry.session_id);
    println!("  Status:      {}", entry.status);
    println!("  Locked:      {}", entry.total_locked);
    println!("  Released:    {}", entry.released);
    println!("  Remaining:   {}", entry.remaining());
    println!("  Counter:     {}", entry.counter_high_watermark);
    println!("  Opened:      {}", entry.created_at.to_rfc3339());
    println!("  Client:      {}", entry.client_account);
    println!("  Provider:    {}", entry.provider_account);
    Ok(())
}
