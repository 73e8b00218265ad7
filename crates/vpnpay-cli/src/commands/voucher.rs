//! `vpnpay voucher`: issue the next voucher for a wallet session.

use clap::Args;
use std::path::PathBuf;
use vpnpay_core::SessionId;

use crate::wallet::{Wallet, DEFAULT_WALLET};

#[derive(Args, Debug)]
pub struct VoucherArgs {
    /// Session id (hex).
    #[arg(short, long)]
    pub session: String,

    /// Cumulative amount claimed so far.
    #[arg(short, long)]
    pub amount: u64,

    /// Explicit counter; defaults to one past the last issued.
    #[arg(long)]
    pub counter: Option<u64>,

    /// Mark this as the closing voucher.
    #[arg(long = "final")]
    pub is_final: bool,

    /// Emit base64 protobuf instead of JSON.
    #[arg(long)]
    pub wire: bool,

    /// Write the voucher to a file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    #[arg(short, long, default_value = DEFAULT_WALLET)]
    pub wallet: PathBuf,
}

pub fn run(args: &VoucherArgs) -> anyhow::Result<()> {
    let session_id = SessionId::from_hex(&args.session)?;
    let mut wallet = Wallet::load(&args.wallet)?;

    let signed = wallet.issue(&session_id, args.amount, args.counter, args.is_final)?;
    wallet.save()?;

    let rendered = if args.wire {
        signed.to_wire_base64()
    } else {
        serde_json::to_string_pretty(&signed)?
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            eprintln!(
                "Voucher #{} for {} written to {}",
                signed.voucher.counter,
                signed.voucher.amount,
                path.display()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
