//! Timeout refund engine.

use chrono::{DateTime, Utc};
use vpnpay_core::{SessionEvent, SessionPolicy, SessionStateMachine};

use crate::error::SettlementError;
use crate::traits::Payout;
use crate::types::{RefundResult, SessionLedgerEntry};

#[derive(Debug, Clone)]
pub struct RefundPlan {
    pub entry: SessionLedgerEntry,
    pub payouts: Vec<Payout>,
    pub result: RefundResult,
}

/// Validate a refund of `entry` at `now` and compute the closed entry.
///
/// The refund is allowed only once strictly more than the policy's refund
/// timeout has passed since the session opened. Whatever the provider has
/// already been paid stays with the provider; only the unreleased
/// remainder goes back to the client. A zero remainder still closes the
/// session.
pub fn plan_refund(
    entry: &SessionLedgerEntry,
    now: DateTime<Utc>,
    policy: &SessionPolicy,
) -> Result<RefundPlan, SettlementError> {
    if !entry.is_active() {
        return Err(SettlementError::SessionClosed(entry.session_id.clone()));
    }

    let elapsed = now.signed_duration_since(entry.created_at);
    if elapsed <= policy.refund_timeout() {
        return Err(SettlementError::TimeoutNotElapsed {
            session_id: entry.session_id.clone(),
            elapsed_secs: elapsed.num_seconds(),
            timeout_secs: policy.refund_timeout_secs,
        });
    }

    let refunded_to_client = entry.remaining();
    let mut next = entry.clone();
    next.status = SessionStateMachine::transition(entry.status, SessionEvent::Refunded)?;

    let payouts = if refunded_to_client > 0 {
        vec![Payout::new(entry.client_account.clone(), refunded_to_client)]
    } else {
        Vec::new()
    };

    let result = RefundResult {
        session_id: entry.session_id.clone(),
        refunded_to_client,
        released: entry.released,
        status: next.status,
    };

    Ok(RefundPlan {
        entry: next,
        payouts,
        result,
    })
}
