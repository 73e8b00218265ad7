use crate::state_machine::{SessionEvent, SessionStatus};

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("malformed voucher: {0}")]
    MalformedVoucher(String),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid account id: {0}")]
    InvalidAccount(String),

    #[error("invalid status transition from {from} on {event}")]
    InvalidStateTransition {
        from: SessionStatus,
        event: SessionEvent,
    },

    #[error("invalid session status value: {0}")]
    InvalidStatus(u8),

    #[error("invalid session policy: {0}")]
    InvalidPolicy(String),
}

impl From<prost::DecodeError> for CoreError {
    fn from(e: prost::DecodeError) -> Self {
        CoreError::MalformedVoucher(format!("wire decode failed: {}", e))
    }
}
