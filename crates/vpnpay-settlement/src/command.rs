use serde::{Deserialize, Serialize};
use vpnpay_core::types::hex_bytes;
use vpnpay_core::{AccountId, SessionId, SignedVoucher};

use crate::types::{RefundResult, SessionLedgerEntry, SettlementResult};

/// Parameters for opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    /// Explicit session id; a fresh UUID v7 id is assigned when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub client_account: AccountId,
    pub provider_account: AccountId,
    #[serde(with = "hex_bytes")]
    pub client_pubkey: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub provider_pubkey: Vec<u8>,
    pub collateral: u64,
}

/// A ledger operation submitted by a client or provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    OpenSession(OpenSessionRequest),
    Voucher {
        session_id: SessionId,
        voucher: SignedVoucher,
    },
    Refund {
        session_id: SessionId,
    },
}

impl Command {
    /// Target session, if the command names one.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::OpenSession(req) => req.session_id.as_ref(),
            Self::Voucher { session_id, .. } | Self::Refund { session_id } => Some(session_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenSession(_) => "open_session",
            Self::Voucher { .. } => "voucher",
            Self::Refund { .. } => "refund",
        }
    }
}

/// Result of a successfully dispatched [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandOutcome {
    Opened(SessionLedgerEntry),
    Settled(SettlementResult),
    Refunded(RefundResult),
}

impl CommandOutcome {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::Opened(entry) => &entry.session_id,
            Self::Settled(result) => &result.session_id,
            Self::Refunded(result) => &result.session_id,
        }
    }
}
