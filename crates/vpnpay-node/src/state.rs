//! Shared node state for HTTP handlers.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use vpnpay_settlement::SessionManager;

use crate::commands::NodeCommand;

/// Shared state for the running node.
///
/// Handlers read the ledger directly; every mutation goes through
/// `command_tx` to the single event loop.
pub struct NodeState {
    /// When the node started.
    pub start_time: Instant,
    /// Read access to sessions and balances.
    pub manager: Arc<SessionManager>,
    /// Channel to send commands to the event loop.
    pub command_tx: mpsc::Sender<NodeCommand>,
}

impl NodeState {
    pub fn new(manager: Arc<SessionManager>, command_tx: mpsc::Sender<NodeCommand>) -> Self {
        Self {
            start_time: Instant::now(),
            manager,
            command_tx,
        }
    }

    pub fn session_count(&self) -> usize {
        self.manager.ledger().len()
    }

    pub fn active_session_count(&self) -> usize {
        self.manager.ledger().active_count()
    }
}
