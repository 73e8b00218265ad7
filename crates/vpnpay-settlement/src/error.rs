use vpnpay_core::{CoreError, SessionId};

/// Settlement-layer errors.
///
/// Every variant is a local validation failure of a single operation; a
/// rejected operation leaves the session entry and escrow untouched.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("malformed voucher: {0}")]
    MalformedVoucher(String),

    #[error("voucher is for session {actual}, submitted against {expected}")]
    SessionMismatch {
        expected: SessionId,
        actual: SessionId,
    },

    #[error("voucher signature invalid for session {0}")]
    SignatureInvalid(SessionId),

    #[error("stale voucher: counter {counter} not above high-water mark {high_watermark}")]
    StaleVoucher { counter: u64, high_watermark: u64 },

    #[error("amount {amount} exceeds locked collateral {total_locked}")]
    OverCollateral { amount: u64, total_locked: u64 },

    #[error("amount {amount} is below already released {released}")]
    AmountRegression { amount: u64, released: u64 },

    #[error("session closed or unknown: {0}")]
    SessionClosed(SessionId),

    #[error("refund timeout not elapsed for {session_id}: {elapsed_secs}s of {timeout_secs}s")]
    TimeoutNotElapsed {
        session_id: SessionId,
        elapsed_secs: i64,
        timeout_secs: u64,
    },

    #[error("counter {counter} must exceed last issued counter {last}")]
    CounterNotIncreasing { counter: u64, last: u64 },

    #[error("amount {amount} is below last issued amount {last}")]
    AmountDecreased { amount: u64, last: u64 },

    #[error("collateral {collateral} below minimum {minimum}")]
    InsufficientCollateral { collateral: u64, minimum: u64 },

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("session already exists: {0}")]
    SessionExists(SessionId),

    #[error("invalid session policy: {0}")]
    InvalidPolicy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SettlementError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedVoucher(_) => "malformed_voucher",
            Self::SessionMismatch { .. } => "session_mismatch",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::StaleVoucher { .. } => "stale_voucher",
            Self::OverCollateral { .. } => "over_collateral",
            Self::AmountRegression { .. } => "amount_regression",
            Self::SessionClosed(_) => "session_closed",
            Self::TimeoutNotElapsed { .. } => "timeout_not_elapsed",
            Self::CounterNotIncreasing { .. } => "counter_not_increasing",
            Self::AmountDecreased { .. } => "amount_decreased",
            Self::InsufficientCollateral { .. } => "insufficient_collateral",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InvalidPublicKey(_) => "invalid_public_key",
            Self::InvalidAccount(_) => "invalid_account",
            Self::InvalidSessionId(_) => "invalid_session_id",
            Self::SessionExists(_) => "session_exists",
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<CoreError> for SettlementError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MalformedVoucher(msg) => Self::MalformedVoucher(msg),
            CoreError::InvalidSessionId(msg) => Self::InvalidSessionId(msg),
            CoreError::InvalidAccount(msg) => Self::InvalidAccount(msg),
            CoreError::InvalidPolicy(msg) => Self::InvalidPolicy(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}
