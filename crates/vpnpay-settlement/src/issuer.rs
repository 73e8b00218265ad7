//! Client-side voucher issuance.
//!
//! The issuer is the only component that holds the session private key.
//! It enforces the same monotonicity the ledger does, so a well-behaved
//! client never produces a voucher the ledger would reject as stale or
//! over-collateral.

use serde::{Deserialize, Serialize};
use vpnpay_core::{SessionId, SignedVoucher, Voucher, VoucherSigner};

use crate::error::SettlementError;

/// Persistent issuer bookkeeping for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerState {
    pub session_id: SessionId,
    pub collateral: u64,
    /// Counter of the last voucher issued (0 before the first).
    pub last_counter: u64,
    /// Amount of the last voucher issued.
    pub last_amount: u64,
    /// Set once a final voucher has been issued.
    pub closed: bool,
}

impl IssuerState {
    pub fn new(session_id: SessionId, collateral: u64) -> Self {
        Self {
            session_id,
            collateral,
            last_counter: 0,
            last_amount: 0,
            closed: false,
        }
    }
}

/// Issues signed vouchers for a single session.
pub struct VoucherIssuer<S: VoucherSigner> {
    state: IssuerState,
    signer: S,
}

impl<S: VoucherSigner> VoucherIssuer<S> {
    pub fn new(session_id: SessionId, collateral: u64, signer: S) -> Self {
        Self::resume(IssuerState::new(session_id, collateral), signer)
    }

    /// Continue issuing from previously saved state.
    pub fn resume(state: IssuerState, signer: S) -> Self {
        Self { state, signer }
    }

    /// Sign a voucher claiming a cumulative `amount`.
    ///
    /// Fails without changing state if `counter` does not exceed the last
    /// issued counter, `amount` is below the last issued amount or above
    /// the collateral, or a final voucher was already issued.
    pub fn issue(
        &mut self,
        amount: u64,
        counter: u64,
        is_final: bool,
    ) -> Result<SignedVoucher, SettlementError> {
        if self.state.closed {
            return Err(SettlementError::SessionClosed(self.state.session_id.clone()));
        }
        if counter <= self.state.last_counter {
            return Err(SettlementError::CounterNotIncreasing {
                counter,
                last: self.state.last_counter,
            });
        }
        if amount < self.state.last_amount {
            return Err(SettlementError::AmountDecreased {
                amount,
                last: self.state.last_amount,
            });
        }
        if amount > self.state.collateral {
            return Err(SettlementError::OverCollateral {
                amount,
                total_locked: self.state.collateral,
            });
        }

        let signed =
            Voucher::new(self.state.session_id.clone(), amount, counter, is_final).sign(&self.signer);

        self.state.last_counter = counter;
        self.state.last_amount = amount;
        self.state.closed = is_final;

        tracing::debug!(
            session_id = %self.state.session_id,
            amount,
            counter,
            is_final,
            "Voucher issued"
        );
        Ok(signed)
    }

    /// Issue with the next counter in sequence.
    pub fn issue_next(&mut self, amount: u64, is_final: bool) -> Result<SignedVoucher, SettlementError> {
        let counter = self.next_counter()?;
        self.issue(amount, counter, is_final)
    }

    pub fn next_counter(&self) -> Result<u64, SettlementError> {
        self.state
            .last_counter
            .checked_add(1)
            .ok_or_else(|| SettlementError::Internal("voucher counter exhausted".into()))
    }

    pub fn state(&self) -> &IssuerState {
        &self.state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.state.session_id
    }

    /// Public half of the session key, registered when the session opens.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signer.public_key_bytes()
    }

    pub fn into_state(self) -> IssuerState {
        self.state
    }
}
