use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use vpnpay_core::{AccountId, SessionId, SessionStatus, SignedVoucher};

use crate::command::OpenSessionRequest;
use crate::error::SettlementError;
use crate::refund::plan_refund;
use crate::settle::plan_settlement;
use crate::traits::{IEscrow, Payout, PendingCommit};
use crate::types::{OperationContext, RefundResult, SessionLedgerEntry, SettlementResult};

/// Ledger of payment sessions keyed by session id.
///
/// Every mutation of a session runs while holding that session's map
/// entry, so operations on one session are serialized and exactly one of
/// several racing closers can succeed. Under that guard an operation
/// validates, writes its [`PendingCommit`] to the context's commit log,
/// moves escrow, and only then replaces the entry. A refused escrow or
/// commit log leaves the entry as it was.
pub struct SessionLedger {
    sessions: DashMap<SessionId, SessionLedgerEntry>,
    escrow: Arc<dyn IEscrow>,
}

impl SessionLedger {
    pub fn new(escrow: Arc<dyn IEscrow>) -> Self {
        Self {
            sessions: DashMap::new(),
            escrow,
        }
    }

    pub fn escrow(&self) -> &Arc<dyn IEscrow> {
        &self.escrow
    }

    /// Open a session: validate the request, lock the collateral, and
    /// record the entry with `created_at = ctx.now`.
    pub fn open(
        &self,
        request: OpenSessionRequest,
        ctx: &OperationContext<'_>,
    ) -> Result<SessionLedgerEntry, SettlementError> {
        if request.collateral == 0 || request.collateral < ctx.policy.min_collateral {
            return Err(SettlementError::InsufficientCollateral {
                collateral: request.collateral,
                minimum: ctx.policy.min_collateral.max(1),
            });
        }
        if !ctx.verifier.is_valid_public_key(&request.client_pubkey) {
            return Err(SettlementError::InvalidPublicKey("client".into()));
        }
        if !ctx.verifier.is_valid_public_key(&request.provider_pubkey) {
            return Err(SettlementError::InvalidPublicKey("provider".into()));
        }

        let session_id = request.session_id.unwrap_or_default();
        if session_id.is_empty() {
            return Err(SettlementError::InvalidSessionId("empty session id".into()));
        }

        match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(_) => Err(SettlementError::SessionExists(session_id)),
            Entry::Vacant(slot) => {
                let entry = SessionLedgerEntry {
                    session_id: session_id.clone(),
                    total_locked: request.collateral,
                    released: 0,
                    counter_high_watermark: 0,
                    created_at: ctx.now,
                    client_pubkey: request.client_pubkey,
                    provider_pubkey: request.provider_pubkey,
                    client_account: request.client_account,
                    provider_account: request.provider_account,
                    status: SessionStatus::Active,
                };

                let available = self.escrow.balance(&entry.client_account);
                if available < entry.total_locked {
                    return Err(SettlementError::InsufficientBalance {
                        available,
                        required: entry.total_locked,
                    });
                }
                self.write_ahead(&entry, entry.total_locked, &[], ctx)?;
                self.escrow
                    .lock(&session_id, &entry.client_account, entry.total_locked)?;
                slot.insert(entry.clone());

                tracing::info!(
                    session_id = %session_id,
                    collateral = entry.total_locked,
                    client = %entry.client_account,
                    provider = %entry.provider_account,
                    "Session opened"
                );
                Ok(entry)
            }
        }
    }

    /// Settle a signed voucher against `session_id`.
    ///
    /// An unknown session is reported as closed.
    pub fn settle(
        &self,
        session_id: &SessionId,
        signed: &SignedVoucher,
        ctx: &OperationContext<'_>,
    ) -> Result<SettlementResult, SettlementError> {
        let mut guard = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SettlementError::SessionClosed(session_id.clone()))?;

        let plan = plan_settlement(&guard, session_id, signed, ctx.verifier).map_err(|e| {
            tracing::debug!(session_id = %session_id, counter = signed.voucher.counter, error = %e, "Voucher rejected");
            e
        })?;

        self.write_ahead(&plan.entry, 0, &plan.payouts, ctx)?;
        self.escrow.release(session_id, &plan.payouts)?;
        *guard = plan.entry;

        tracing::info!(
            session_id = %session_id,
            counter = plan.result.counter,
            paid = plan.result.paid_to_provider,
            released = plan.result.released,
            refunded = plan.result.refunded_to_client,
            status = %plan.result.status,
            "Voucher settled"
        );
        Ok(plan.result)
    }

    /// Refund the unreleased remainder of a session whose timeout has
    /// passed.
    pub fn refund(
        &self,
        session_id: &SessionId,
        ctx: &OperationContext<'_>,
    ) -> Result<RefundResult, SettlementError> {
        let mut guard = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SettlementError::SessionClosed(session_id.clone()))?;

        let plan = plan_refund(&guard, ctx.now, ctx.policy)?;

        self.write_ahead(&plan.entry, 0, &plan.payouts, ctx)?;
        self.escrow.release(session_id, &plan.payouts)?;
        *guard = plan.entry;

        tracing::info!(
            session_id = %session_id,
            refunded = plan.result.refunded_to_client,
            kept_by_provider = plan.result.released,
            "Session refunded"
        );
        Ok(plan.result)
    }

    /// Hand the post-operation state to the commit log, if any.
    fn write_ahead(
        &self,
        entry: &SessionLedgerEntry,
        locked: u64,
        payouts: &[Payout],
        ctx: &OperationContext<'_>,
    ) -> Result<(), SettlementError> {
        let Some(log) = ctx.commit_log else {
            return Ok(());
        };
        let commit = self.pending_commit(entry, locked, payouts)?;
        log.write(&commit).map_err(|e| {
            tracing::error!(session_id = %entry.session_id, error = %e, "Commit log write failed");
            e
        })
    }

    /// Balances and escrow as they will stand once `locked` has moved into
    /// escrow and `payouts` have been paid out of it.
    fn pending_commit(
        &self,
        entry: &SessionLedgerEntry,
        locked: u64,
        payouts: &[Payout],
    ) -> Result<PendingCommit, SettlementError> {
        let overflow = || SettlementError::Internal("balance overflow".into());

        let paid = payouts
            .iter()
            .try_fold(0u64, |acc, p| acc.checked_add(p.amount))
            .ok_or_else(overflow)?;
        let held = self
            .escrow
            .escrowed(&entry.session_id)
            .checked_add(locked)
            .ok_or_else(overflow)?;
        let escrowed = held
            .checked_sub(paid)
            .ok_or(SettlementError::InsufficientBalance {
                available: held,
                required: paid,
            })?;

        let mut balances: Vec<(AccountId, u64)> = Vec::with_capacity(2);
        for account in [&entry.client_account, &entry.provider_account] {
            if balances.iter().any(|(a, _)| a == account) {
                continue;
            }
            let mut balance = self.escrow.balance(account);
            if account == &entry.client_account {
                balance = balance
                    .checked_sub(locked)
                    .ok_or(SettlementError::InsufficientBalance {
                        available: balance,
                        required: locked,
                    })?;
            }
            for payout in payouts.iter().filter(|p| &p.to == account) {
                balance = balance.checked_add(payout.amount).ok_or_else(overflow)?;
            }
            balances.push((account.clone(), balance));
        }

        Ok(PendingCommit {
            entry: entry.clone(),
            balances,
            escrowed,
        })
    }

    pub fn get(&self, session_id: &SessionId) -> Option<SessionLedgerEntry> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    /// Insert an entry loaded from storage, replacing any existing one.
    pub fn restore(&self, entry: SessionLedgerEntry) {
        tracing::debug!(session_id = %entry.session_id, status = %entry.status, "Session restored");
        self.sessions.insert(entry.session_id.clone(), entry);
    }

    /// Snapshot of all entries, ordered by session id.
    pub fn entries(&self) -> Vec<SessionLedgerEntry> {
        let mut entries: Vec<SessionLedgerEntry> =
            self.sessions.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        entries
    }

    pub fn active_count(&self) -> usize {
        self.sessions.iter().filter(|e| e.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
