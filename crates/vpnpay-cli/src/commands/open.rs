//! `vpnpay open`: lock collateral and start a payment session.

use clap::Args;
use std::path::PathBuf;
use vpnpay_core::{AccountId, SessionId, VoucherSigner};
use vpnpay_crypto::{KeyPair, PublicKey};
use vpnpay_settlement::{OpenSessionRequest, SessionLedgerEntry};

use crate::client::{NodeClient, DEFAULT_ENDPOINT};
use crate::wallet::{Wallet, DEFAULT_WALLET};

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Account funding the collateral.
    #[arg(long)]
    pub client: String,

    /// Account paid by vouchers.
    #[arg(long)]
    pub provider: String,

    /// Provider public key (hex).
    #[arg(long)]
    pub provider_pubkey: String,

    /// Collateral to lock (atomic units).
    #[arg(short, long)]
    pub collateral: u64,

    /// Wallet file the session key is written to.
    #[arg(short, long, default_value = DEFAULT_WALLET)]
    pub wallet: PathBuf,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

/// Generate the session key and id, store them in the wallet, and build
/// the open request. The key is on disk before any collateral moves.
fn stage_session(args: &OpenArgs) -> anyhow::Result<(OpenSessionRequest, Wallet)> {
    let provider_pubkey = PublicKey::from_hex(&args.provider_pubkey)?;
    let client_account = AccountId::new(args.client.as_str())?;
    let provider_account = AccountId::new(args.provider.as_str())?;

    let session_key = KeyPair::generate();
    let session_id = SessionId::new();

    let mut wallet = Wallet::load(&args.wallet)?;
    wallet.add_session(&session_key, session_id.clone(), args.collateral);
    wallet.save()?;
    tracing::debug!(session_id = %session_id, wallet = %wallet.path().display(), "session key stored");

    let request = OpenSessionRequest {
        session_id: Some(session_id),
        client_account,
        provider_account,
        client_pubkey: session_key.public_key_bytes(),
        provider_pubkey: provider_pubkey.as_bytes().to_vec(),
        collateral: args.collateral,
    };
    Ok((request, wallet))
}

pub async fn run(args: &OpenArgs) -> anyhow::Result<()> {
    let (request, wallet) = stage_session(args)?;

    // A lost response may still have opened the session, so the wallet
    // entry is kept whatever the node answers.
    let entry: SessionLedgerEntry = NodeClient::new(&args.endpoint)
        .post("/api/v1/sessions", &request)
        .await?;
    if Some(&entry.session_id) != request.session_id.as_ref() {
        anyhow::bail!("node opened {} instead of the requested session", entry.session_id);
    }

    println!("Session opened!");
    println!("  Session:     {}", entry.session_id);
    println!("  Collateral:  {}", entry.total_locked);
    println!("  Session key: {}", PublicKey::from_bytes(&request.client_pubkey)?.to_hex());
    println!("  Wallet:      {}", wallet.path().display());
    Ok(())
}
