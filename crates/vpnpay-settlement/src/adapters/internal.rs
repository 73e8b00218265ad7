use dashmap::DashMap;
use vpnpay_core::{AccountId, SessionId};

use crate::error::SettlementError;
use crate::traits::{IEscrow, Payout};

/// In-memory escrow adapter.
///
/// Keeps account balances and per-session escrow amounts. Lock ordering is
/// always escrow entry first, then account balances.
pub struct InternalEscrow {
    balances: DashMap<AccountId, u64>,
    escrows: DashMap<SessionId, u64>,
}

impl InternalEscrow {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            escrows: DashMap::new(),
        }
    }

    /// Credit an account from outside the ledger.
    pub fn deposit(&self, account: &AccountId, amount: u64) -> u64 {
        let mut balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
        let new_balance = *balance;
        drop(balance);
        tracing::debug!(account = %account, amount, balance = new_balance, "Deposit credited");
        new_balance
    }

    /// Overwrite an account balance when reloading persisted state.
    pub fn restore_balance(&self, account: AccountId, amount: u64) {
        self.balances.insert(account, amount);
    }

    /// Overwrite a session's escrow amount when reloading persisted state.
    pub fn restore_escrow(&self, session_id: SessionId, amount: u64) {
        if amount == 0 {
            self.escrows.remove(&session_id);
        } else {
            self.escrows.insert(session_id, amount);
        }
    }
}

impl Default for InternalEscrow {
    fn default() -> Self {
        Self::new()
    }
}

impl IEscrow for InternalEscrow {
    fn lock(
        &self,
        session_id: &SessionId,
        from: &AccountId,
        amount: u64,
    ) -> Result<(), SettlementError> {
        let locked = {
            let mut escrow = self.escrows.entry(session_id.clone()).or_insert(0);
            let mut balance = self.balances.entry(from.clone()).or_insert(0);
            let result = match escrow.checked_add(amount) {
                None => Err(SettlementError::Internal("escrow overflow".into())),
                Some(_) if *balance < amount => Err(SettlementError::InsufficientBalance {
                    available: *balance,
                    required: amount,
                }),
                Some(new_escrow) => {
                    *balance -= amount;
                    *escrow = new_escrow;
                    Ok(())
                }
            };
            result
        };
        if locked.is_err() {
            self.escrows.remove_if(session_id, |_, v| *v == 0);
        }
        locked?;

        tracing::info!(session_id = %session_id, account = %from, amount, "Collateral locked");
        Ok(())
    }

    fn release(&self, session_id: &SessionId, payouts: &[Payout]) -> Result<(), SettlementError> {
        let required = payouts
            .iter()
            .try_fold(0u64, |acc, p| acc.checked_add(p.amount))
            .ok_or_else(|| SettlementError::Internal("payout total overflow".into()))?;
        if required == 0 {
            return Ok(());
        }

        let Some(mut escrow) = self.escrows.get_mut(session_id) else {
            return Err(SettlementError::InsufficientBalance {
                available: 0,
                required,
            });
        };
        if *escrow < required {
            return Err(SettlementError::InsufficientBalance {
                available: *escrow,
                required,
            });
        }
        *escrow -= required;

        for payout in payouts.iter().filter(|p| p.amount > 0) {
            let mut balance = self.balances.entry(payout.to.clone()).or_insert(0);
            *balance = balance.saturating_add(payout.amount);
        }
        let drained = *escrow == 0;
        drop(escrow);
        if drained {
            self.escrows.remove(session_id);
        }

        for payout in payouts.iter().filter(|p| p.amount > 0) {
            tracing::info!(
                session_id = %session_id,
                to = %payout.to,
                amount = payout.amount,
                "Escrow released"
            );
        }
        Ok(())
    }

    fn balance(&self, account: &AccountId) -> u64 {
        self.balances.get(account).map(|v| *v).unwrap_or(0)
    }

    fn escrowed(&self, session_id: &SessionId) -> u64 {
        self.escrows.get(session_id).map(|v| *v).unwrap_or(0)
    }

    fn escrow_id(&self) -> &str {
        "escrow-internal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(name: &str) -> AccountId {
        AccountId::new(name).unwrap()
    }

    /// Sum of all balances and escrows; only deposits change it.
    fn total_supply(escrow: &InternalEscrow) -> u128 {
        let accounts: u128 = escrow.balances.iter().map(|e| *e.value() as u128).sum();
        let escrowed: u128 = escrow.escrows.iter().map(|e| *e.value() as u128).sum();
        accounts + escrowed
    }

    #[test]
    fn test_deposit_and_balance() {
        let escrow = InternalEscrow::new();
        assert_eq!(escrow.balance(&acct("alice")), 0);
        assert_eq!(escrow.deposit(&acct("alice"), 500), 500);
        assert_eq!(escrow.deposit(&acct("alice"), 250), 750);
        assert_eq!(escrow.balance(&acct("alice")), 750);
    }

    #[test]
    fn test_lock_moves_funds_into_escrow() {
        let escrow = InternalEscrow::new();
        let sid = SessionId::new();
        escrow.deposit(&acct("alice"), 1500);

        escrow.lock(&sid, &acct("alice"), 1000).unwrap();
        assert_eq!(escrow.balance(&acct("alice")), 500);
        assert_eq!(escrow.escrowed(&sid), 1000);
        assert_eq!(total_supply(&escrow), 1500);
    }

    #[test]
    fn test_lock_insufficient_balance_is_noop() {
        let escrow = InternalEscrow::new();
        let sid = SessionId::new();
        escrow.deposit(&acct("alice"), 100);

        let result = escrow.lock(&sid, &acct("alice"), 1000);
        assert!(matches!(
            result,
            Err(SettlementError::InsufficientBalance {
                available: 100,
                required: 1000
            })
        ));
        assert_eq!(escrow.balance(&acct("alice")), 100);
        assert_eq!(escrow.escrowed(&sid), 0);
    }

    #[test]
    fn test_release_pays_out_all_or_nothing() {
        let escrow = InternalEscrow::new();
        let sid = SessionId::new();
        escrow.deposit(&acct("alice"), 1000);
        escrow.lock(&sid, &acct("alice"), 1000).unwrap();

        let too_much = [
            Payout::new(acct("bob"), 900),
            Payout::new(acct("alice"), 200),
        ];
        assert!(escrow.release(&sid, &too_much).is_err());
        assert_eq!(escrow.balance(&acct("bob")), 0);
        assert_eq!(escrow.escrowed(&sid), 1000);

        let ok = [
            Payout::new(acct("bob"), 900),
            Payout::new(acct("alice"), 100),
        ];
        escrow.release(&sid, &ok).unwrap();
        assert_eq!(escrow.balance(&acct("bob")), 900);
        assert_eq!(escrow.balance(&acct("alice")), 100);
        assert_eq!(escrow.escrowed(&sid), 0);
        assert_eq!(total_supply(&escrow), 1000);
    }

    #[test]
    fn test_release_from_unknown_escrow() {
        let escrow = InternalEscrow::new();
        let result = escrow.release(&SessionId::new(), &[Payout::new(acct("bob"), 1)]);
        assert!(matches!(
            result,
            Err(SettlementError::InsufficientBalance { available: 0, .. })
        ));
        assert!(escrow.release(&SessionId::new(), &[]).is_ok());
    }

    #[test]
    fn test_restore() {
        let escrow = InternalEscrow::new();
        let sid = SessionId::new();
        escrow.restore_balance(acct("carol"), 42);
        escrow.restore_escrow(sid.clone(), 7);
        assert_eq!(escrow.balance(&acct("carol")), 42);
        assert_eq!(escrow.escrowed(&sid), 7);
        assert_eq!(escrow.escrow_id(), "escrow-internal");
    }
}
