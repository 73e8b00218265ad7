//! `vpnpay settle`: submit a voucher file to the node.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use vpnpay_core::{SessionId, SignedVoucher};
use vpnpay_settlement::SettlementResult;

use crate::client::{NodeClient, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Voucher file, either JSON or base64 protobuf.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Session to settle against; defaults to the voucher's session.
    #[arg(short, long)]
    pub session: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

/// A voucher as read from disk.
#[derive(Debug, PartialEq, Eq)]
pub enum VoucherFile {
    Json(SignedVoucher),
    Wire(String),
}

pub fn parse_voucher_file(contents: &str) -> anyhow::Result<VoucherFile> {
    let trimmed = contents.trim();
    if trimmed.starts_with('{') {
        return Ok(VoucherFile::Json(serde_json::from_str(trimmed)?));
    }
    // Validate locally before sending.
    SignedVoucher::from_wire_base64(trimmed)?;
    Ok(VoucherFile::Wire(trimmed.to_string()))
}

#[derive(Serialize)]
struct JsonBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a SessionId>,
    voucher: &'a SignedVoucher,
}

#[derive(Serialize)]
struct WireBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a SessionId>,
    wire: &'a str,
}

pub async fn run(args: &SettleArgs) -> anyhow::Result<()> {
    let session_id = args.session.as_deref().map(SessionId::from_hex).transpose()?;
    let contents = std::fs::read_to_string(&args.file)?;
    let client = NodeClient::new(&args.endpoint);

    let result: SettlementResult = match parse_voucher_file(&contents)? {
        VoucherFile::Json(voucher) => {
            let body = JsonBody {
                session_id: session_id.as_ref(),
                voucher: &voucher,
            };
            client.post("/api/v1/vouchers", &body).await?
        }
        VoucherFile::Wire(wire) => {
            let body = WireBody {
                session_id: session_id.as_ref(),
                wire: &wire,
            };
            client.post("/api/v1/vouchers/wire", &body).await?
        }
    };

    println!("Voucher settled!");
    println!("  Session:     {}", result.session_id);
    println!("  Counter:     {}", result.counter);
    println!("  Paid:        {}", result.paid_to_provider);
    println!("  Released:    {}", result.released);
    if result.refunded_to_client > 0 {
        println!("  Refunded:    {}", result.refunded_to_client);
    }
    println!("  Status:      {}", result.status);
    println!("  Digest:      {}", result.voucher_digest);
    Ok(())
}
