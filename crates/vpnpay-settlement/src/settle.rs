//! Voucher settlement engine.
//!
//! [`plan_settlement`] validates a signed voucher against a session entry
//! and computes the entry that would result from accepting it, without
//! touching any shared state. The ledger applies the plan under the
//! session's lock.

use vpnpay_core::{SessionEvent, SessionId, SessionStateMachine, SignatureVerifier, SignedVoucher};

use crate::error::SettlementError;
use crate::traits::Payout;
use crate::types::{SessionLedgerEntry, SettlementResult};

/// An accepted voucher: the updated entry, the escrow payouts that realise
/// it, and the result reported to the caller.
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub entry: SessionLedgerEntry,
    pub payouts: Vec<Payout>,
    pub result: SettlementResult,
}

/// Validate `signed` for settlement against `entry`.
///
/// Checks run in a fixed order and the first failure is returned:
/// session active, voucher bound to `session_id`, amount within the
/// collateral ceiling, signature, counter freshness, amount monotonicity.
/// The ceiling is checked before the signature so an over-collateral claim
/// is rejected the same way whether or not it is properly signed.
pub fn plan_settlement(
    entry: &SessionLedgerEntry,
    session_id: &SessionId,
    signed: &SignedVoucher,
    verifier: &dyn SignatureVerifier,
) -> Result<SettlementPlan, SettlementError> {
    let voucher = &signed.voucher;

    if !entry.is_active() {
        return Err(SettlementError::SessionClosed(entry.session_id.clone()));
    }

    if voucher.session_id != *session_id || entry.session_id != *session_id {
        return Err(SettlementError::SessionMismatch {
            expected: entry.session_id.clone(),
            actual: voucher.session_id.clone(),
        });
    }

    if voucher.amount > entry.total_locked {
        return Err(SettlementError::OverCollateral {
            amount: voucher.amount,
            total_locked: entry.total_locked,
        });
    }

    if !signed.verify(verifier, &entry.client_pubkey) {
        return Err(SettlementError::SignatureInvalid(session_id.clone()));
    }

    if voucher.counter <= entry.counter_high_watermark {
        return Err(SettlementError::StaleVoucher {
            counter: voucher.counter,
            high_watermark: entry.counter_high_watermark,
        });
    }

    if voucher.amount < entry.released {
        return Err(SettlementError::AmountRegression {
            amount: voucher.amount,
            released: entry.released,
        });
    }

    let paid_to_provider = voucher.amount - entry.released;
    let event = if voucher.is_final {
        SessionEvent::FinalVoucherSettled
    } else {
        SessionEvent::VoucherSettled
    };
    let status = SessionStateMachine::transition(entry.status, event)?;

    let mut next = entry.clone();
    next.released = voucher.amount;
    next.counter_high_watermark = voucher.counter;
    next.status = status;

    let refunded_to_client = if voucher.is_final { next.remaining() } else { 0 };

    let mut payouts = Vec::with_capacity(2);
    if paid_to_provider > 0 {
        payouts.push(Payout::new(entry.provider_account.clone(), paid_to_provider));
    }
    if refunded_to_client > 0 {
        payouts.push(Payout::new(entry.client_account.clone(), refunded_to_client));
    }

    let result = SettlementResult {
        session_id: session_id.clone(),
        counter: voucher.counter,
        paid_to_provider,
        released: next.released,
        refunded_to_client,
        status,
        voucher_digest: vpnpay_crypto::voucher_digest_hex(voucher),
    };

    Ok(SettlementPlan {
        entry: next,
        payouts,
        result,
    })
}
