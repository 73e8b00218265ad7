//! Shared fixtures for cross-crate scenarios.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use vpnpay_core::{AccountId, SessionId, SessionPolicy, VoucherSigner};
use vpnpay_crypto::{Ed25519Verifier, KeyPair};
use vpnpay_settlement::{
    Command, CommandOutcome, IEscrow, InternalEscrow, OpenSessionRequest, SessionManager,
    VoucherIssuer,
};

pub const CLIENT: &str = "client";
pub const PROVIDER: &str = "provider";

pub fn acct(name: &str) -> AccountId {
    AccountId::new(name).expect("valid account name")
}

/// A ledger host with a funded client account.
pub struct Harness {
    pub escrow: Arc<InternalEscrow>,
    pub manager: Arc<SessionManager>,
}

impl Harness {
    pub fn new(client_funds: u64) -> Self {
        Self::with_policy(client_funds, SessionPolicy::default())
    }

    pub fn with_policy(client_funds: u64, policy: SessionPolicy) -> Self {
        let escrow = Arc::new(InternalEscrow::new());
        escrow.deposit(&acct(CLIENT), client_funds);
        let manager = Arc::new(
            SessionManager::new(escrow.clone(), Arc::new(Ed25519Verifier), policy)
                .expect("valid policy"),
        );
        tracing::debug!(client_funds, "harness ready");
        Self { escrow, manager }
    }

    /// Open a session at `now` with a fresh session key and return the
    /// client's issuer for it.
    pub fn open(&self, collateral: u64, now: DateTime<Utc>) -> VoucherIssuer<KeyPair> {
        let session_key = KeyPair::generate();
        let outcome = self
            .manager
            .dispatch(
                Command::OpenSession(OpenSessionRequest {
                    session_id: None,
                    client_account: acct(CLIENT),
                    provider_account: acct(PROVIDER),
                    client_pubkey: session_key.public_key_bytes(),
                    provider_pubkey: KeyPair::generate().public_key_bytes(),
                    collateral,
                }),
                now,
            )
            .expect("open session");
        let CommandOutcome::Opened(entry) = outcome else {
            panic!("expected an opened session, got {:?}", outcome);
        };
        VoucherIssuer::new(entry.session_id, entry.total_locked, session_key)
    }

    pub fn balance(&self, name: &str) -> u64 {
        self.escrow.balance(&acct(name))
    }

    pub fn escrowed(&self, session_id: &SessionId) -> u64 {
        self.escrow.escrowed(session_id)
    }
}
