//! `vpnpay refund`: reclaim a session's remainder after the timeout.

use clap::Args;
use serde::Serialize;
use vpnpay_core::SessionId;
use vpnpay_settlement::RefundResult;

use crate::client::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct RefundArgs {
    /// Session id (hex).
    #[arg(short, long)]
    pub session: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct RefundRequest {
    session_id: SessionId,
}

pub async fn run(args: &RefundArgs) -> anyhow::Result<()> {
    let request = RefundRequest {
        session_id: SessionId::from_hex(&args.session)?,
    };
    let result: RefundResult = NodeClient::new(&args.endpoint)
        .post("/api/v1/refunds", &request)
        .await?;

    println!("Session refunded!");
    println!("  Session:   {}", result.session_id);
    println!("  Refunded:  {}", result.refunded_to_client);
    println!("  Provider kept: {}", result.released);
    Ok(())
}
