use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vpnpay_core::types::hex_bytes;
use vpnpay_core::{AccountId, SessionId, SessionPolicy, SessionStatus, SignatureVerifier};

use crate::traits::CommitLog;

/// Per-session record held by the settlement ledger.
///
/// `released` and `counter_high_watermark` only ever grow, and
/// `released <= total_locked` always holds. Once `status` is `Closed` the
/// entry is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLedgerEntry {
    pub session_id: SessionId,
    /// Collateral locked when the session was opened.
    pub total_locked: u64,
    /// Cumulative amount paid out to the provider.
    pub released: u64,
    /// Highest voucher counter accepted so far (0 before any voucher).
    pub counter_high_watermark: u64,
    pub created_at: DateTime<Utc>,
    /// Session public key vouchers must be signed with.
    #[serde(with = "hex_bytes")]
    pub client_pubkey: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub provider_pubkey: Vec<u8>,
    /// Account that funded the collateral and receives refunds.
    pub client_account: AccountId,
    /// Account that receives voucher payouts.
    pub provider_account: AccountId,
    pub status: SessionStatus,
}

impl SessionLedgerEntry {
    /// Collateral not yet released to the provider.
    pub fn remaining(&self) -> u64 {
        self.total_locked.saturating_sub(self.released)
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Outcome of an accepted voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub session_id: SessionId,
    pub counter: u64,
    /// Amount moved to the provider by this voucher (the delta).
    pub paid_to_provider: u64,
    /// Cumulative amount released after this voucher.
    pub released: u64,
    /// Remainder returned to the client; non-zero only for a final voucher.
    pub refunded_to_client: u64,
    pub status: SessionStatus,
    /// Hex BLAKE3 digest of the settled voucher's canonical payload.
    pub voucher_digest: String,
}

/// Outcome of a timeout refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    pub session_id: SessionId,
    pub refunded_to_client: u64,
    /// Amount the provider kept, unchanged by the refund.
    pub released: u64,
    pub status: SessionStatus,
}

/// Host-provided inputs for a single operation: the current time, the
/// active session policy, and the signature primitive.
#[derive(Clone, Copy)]
pub struct OperationContext<'a> {
    pub now: DateTime<Utc>,
    pub policy: &'a SessionPolicy,
    pub verifier: &'a dyn SignatureVerifier,
    /// Durable sink written before each commit, if the host has one.
    pub commit_log: Option<&'a dyn CommitLog>,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        now: DateTime<Utc>,
        policy: &'a SessionPolicy,
        verifier: &'a dyn SignatureVerifier,
    ) -> Self {
        Self {
            now,
            policy,
            verifier,
            commit_log: None,
        }
    }

    pub fn with_commit_log(mut self, commit_log: &'a dyn CommitLog) -> Self {
        self.commit_log = Some(commit_log);
        self
    }
}

impl std::fmt::Debug for OperationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("now", &self.now)
            .field("policy", self.policy)
            .field("commit_log", &self.commit_log.is_some())
            .finish_non_exhaustive()
    }
}
