//! Commands dispatched from the HTTP API to the node event loop.

use tokio::sync::oneshot;
use vpnpay_settlement::{Command, CommandOutcome, SettlementError};

/// A command sent from the HTTP API to the node's main event loop.
pub enum NodeCommand {
    /// Apply a ledger command and persist the touched state.
    Execute {
        command: Command,
        reply: oneshot::Sender<Result<CommandOutcome, SettlementError>>,
    },
}
