use std::fmt;

use crate::error::CoreError;

/// Lifecycle status of a payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SessionStatus {
    /// Collateral is locked and vouchers may be settled.
    Active,
    /// Settled by a final voucher or refunded. Terminal.
    Closed,
}

impl SessionStatus {
    /// Whether this is a terminal state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Numeric form used by ledger hosts (1 = active, 0 = closed).
    pub fn to_u8(&self) -> u8 {
        match self {
            Self::Active => 1,
            Self::Closed => 0,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, CoreError> {
        match value {
            1 => Ok(Self::Active),
            0 => Ok(Self::Closed),
            _ => Err(CoreError::InvalidStatus(value)),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Events that drive session status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A non-final voucher was accepted.
    VoucherSettled,
    /// A final voucher was accepted.
    FinalVoucherSettled,
    /// The unreleased remainder was refunded after the timeout.
    Refunded,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VoucherSettled => write!(f, "VoucherSettled"),
            Self::FinalVoucherSettled => write!(f, "FinalVoucherSettled"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

/// Session status transitions.
///
/// Valid transitions:
/// - Active → Active (VoucherSettled)
/// - Active → Closed (FinalVoucherSettled)
/// - Active → Closed (Refunded)
///
/// Nothing leaves Closed.
pub struct SessionStateMachine;

impl SessionStateMachine {
    pub fn transition(
        current: SessionStatus,
        event: SessionEvent,
    ) -> Result<SessionStatus, CoreError> {
        match (current, event) {
            (SessionStatus::Active, SessionEvent::VoucherSettled) => Ok(SessionStatus::Active),
            (SessionStatus::Active, SessionEvent::FinalVoucherSettled)
            | (SessionStatus::Active, SessionEvent::Refunded) => Ok(SessionStatus::Closed),
            (SessionStatus::Closed, event) => Err(CoreError::InvalidStateTransition {
                from: current,
                event,
            }),
        }
    }

    pub fn is_valid_transition(current: SessionStatus, event: SessionEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
