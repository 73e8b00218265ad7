//! vpnpay Settlement Layer
//!
//! Session ledger, settlement and refund engines, the client-side voucher
//! issuer, and pluggable escrow adapters that move collateral on the host
//! ledger.

pub mod error;
pub mod types;
pub mod traits;
pub mod settle;
pub mod refund;
pub mod ledger;
pub mod issuer;
pub mod command;
pub mod manager;
pub mod adapters;

pub use adapters::internal::InternalEscrow;
pub use command::{Command, CommandOutcome, OpenSessionRequest};
pub use error::SettlementError;
pub use issuer::{IssuerState, VoucherIssuer};
pub use ledger::SessionLedger;
pub use manager::SessionManager;
pub use traits::{CommitLog, IEscrow, Payout, PendingCommit};
pub use types::{OperationContext, RefundResult, SessionLedgerEntry, SettlementResult};
