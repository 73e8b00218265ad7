use serde::{Deserialize, Serialize};
use vpnpay_core::{AccountId, SessionId};

use crate::error::SettlementError;
use crate::types::SessionLedgerEntry;

/// A single credit paid out of a session's escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: AccountId,
    pub amount: u64,
}

impl Payout {
    pub fn new(to: AccountId, amount: u64) -> Self {
        Self { to, amount }
    }
}

/// Escrow adapter interface.
///
/// Bridges the session ledger to the host's value transfer: collateral is
/// moved out of the client's account into a per-session escrow when a
/// session opens, and paid out of that escrow on settlement or refund.
pub trait IEscrow: Send + Sync {
    /// Move `amount` from `from` into the escrow held for `session_id`.
    fn lock(
        &self,
        session_id: &SessionId,
        from: &AccountId,
        amount: u64,
    ) -> Result<(), SettlementError>;

    /// Pay every payout out of the session's escrow, all or nothing.
    fn release(&self, session_id: &SessionId, payouts: &[Payout]) -> Result<(), SettlementError>;

    /// Spendable balance of an account.
    fn balance(&self, account: &AccountId) -> u64;

    /// Amount still held in escrow for a session.
    fn escrowed(&self, session_id: &SessionId) -> u64;

    /// Unique identifier of this adapter (e.g. "escrow-internal").
    fn escrow_id(&self) -> &str;
}

/// Everything a ledger operation is about to change, computed after
/// validation and before any in-memory state moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    /// The session entry as it will be committed.
    pub entry: SessionLedgerEntry,
    /// Spendable balances of the session's accounts after the operation.
    pub balances: Vec<(AccountId, u64)>,
    /// Amount left in the session's escrow after the operation.
    pub escrowed: u64,
}

/// Write-ahead sink for ledger operations.
///
/// Invoked while the session's entry is held, after every precondition
/// has passed. An error aborts the operation with nothing applied.
pub trait CommitLog: Send + Sync {
    fn write(&self, commit: &PendingCommit) -> Result<(), SettlementError>;
}
