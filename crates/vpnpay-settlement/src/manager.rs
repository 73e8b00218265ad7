use std::sync::Arc;

use chrono::{DateTime, Utc};
use vpnpay_core::{SessionId, SessionPolicy, SignatureVerifier, SignedVoucher};

use crate::command::{Command, CommandOutcome, OpenSessionRequest};
use crate::error::SettlementError;
use crate::ledger::SessionLedger;
use crate::traits::{CommitLog, IEscrow};
use crate::types::{OperationContext, RefundResult, SessionLedgerEntry, SettlementResult};

/// Entry point for every ledger operation.
///
/// Owns the session ledger together with the host primitives (escrow,
/// signature verifier, policy) and routes [`Command`]s to the matching
/// engine. The current time is supplied per call.
pub struct SessionManager {
    ledger: SessionLedger,
    verifier: Arc<dyn SignatureVerifier>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(
        escrow: Arc<dyn IEscrow>,
        verifier: Arc<dyn SignatureVerifier>,
        policy: SessionPolicy,
    ) -> Result<Self, SettlementError> {
        policy.validate()?;
        tracing::info!(
            escrow = escrow.escrow_id(),
            refund_timeout_secs = policy.refund_timeout_secs,
            min_collateral = policy.min_collateral,
            "Session manager initialized"
        );
        Ok(Self {
            ledger: SessionLedger::new(escrow),
            verifier,
            policy,
        })
    }

    fn context(&self, now: DateTime<Utc>) -> OperationContext<'_> {
        OperationContext::new(now, &self.policy, self.verifier.as_ref())
    }

    /// Execute one command at time `now`.
    pub fn dispatch(
        &self,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome, SettlementError> {
        self.route(command, self.context(now))
    }

    /// Execute one command, writing its changes to `commit_log` before
    /// they are applied in memory.
    pub fn dispatch_logged(
        &self,
        command: Command,
        now: DateTime<Utc>,
        commit_log: &dyn CommitLog,
    ) -> Result<CommandOutcome, SettlementError> {
        self.route(command, self.context(now).with_commit_log(commit_log))
    }

    fn route(
        &self,
        command: Command,
        ctx: OperationContext<'_>,
    ) -> Result<CommandOutcome, SettlementError> {
        tracing::debug!(command = command.name(), "Dispatching command");
        match command {
            Command::OpenSession(request) => {
                self.ledger.open(request, &ctx).map(CommandOutcome::Opened)
            }
            Command::Voucher {
                session_id,
                voucher,
            } => self
                .ledger
                .settle(&session_id, &voucher, &ctx)
                .map(CommandOutcome::Settled),
            Command::Refund { session_id } => self
                .ledger
                .refund(&session_id, &ctx)
                .map(CommandOutcome::Refunded),
        }
    }

    pub fn open_session(
        &self,
        request: OpenSessionRequest,
        now: DateTime<Utc>,
    ) -> Result<SessionLedgerEntry, SettlementError> {
        self.ledger.open(request, &self.context(now))
    }

    pub fn settle(
        &self,
        session_id: &SessionId,
        voucher: &SignedVoucher,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult, SettlementError> {
        self.ledger.settle(session_id, voucher, &self.context(now))
    }

    pub fn refund(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<RefundResult, SettlementError> {
        self.ledger.refund(session_id, &self.context(now))
    }

    pub fn session(&self, session_id: &SessionId) -> Option<SessionLedgerEntry> {
        self.ledger.get(session_id)
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn escrow(&self) -> &Arc<dyn IEscrow> {
        self.ledger.escrow()
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }
}
