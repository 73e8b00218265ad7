//! The vpnpay ledger host.
//!
//! Owns the session manager, escrow and storage. Spawns the HTTP API and
//! runs a single event loop that applies every mutating command, so the
//! ledger has exactly one writer.

use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use vpnpay_core::AccountId;
use vpnpay_crypto::Ed25519Verifier;
use vpnpay_settlement::{
    Command, CommandOutcome, IEscrow, InternalEscrow, SessionManager, SettlementError,
};

use crate::commands::NodeCommand;
use crate::config::VpnpayConfig;
use crate::state::NodeState;
use crate::storage::{Snapshot, Storage};

const GENESIS_KEY: &str = "genesis_applied";

pub struct VpnpayNode {
    config: VpnpayConfig,
    escrow: Arc<InternalEscrow>,
    manager: Arc<SessionManager>,
    /// Persistent storage (None until `open_storage`).
    storage: Option<Storage>,
    /// Shared state accessible from HTTP handlers.
    node_state: Option<Arc<NodeState>>,
    /// Receives commands from the HTTP API.
    command_rx: Option<mpsc::Receiver<NodeCommand>>,
}

impl VpnpayNode {
    pub fn new(config: VpnpayConfig) -> Result<Self> {
        config.validate()?;

        let escrow = Arc::new(InternalEscrow::new());
        let manager = Arc::new(SessionManager::new(
            escrow.clone(),
            Arc::new(Ed25519Verifier),
            config.policy.clone(),
        )?);

        Ok(Self {
            config,
            escrow,
            manager,
            storage: None,
            node_state: None,
            command_rx: None,
        })
    }

    /// Open storage and rebuild the in-memory ledger from it.
    pub fn open_storage(&mut self) -> Result<()> {
        let storage = Storage::open(&self.config.storage.data_dir)?;
        tracing::info!(path = %self.config.storage.data_dir.display(), "storage initialized");

        for (account, balance) in storage.load_balances()? {
            self.escrow.restore_balance(account, balance);
        }
        for (session_id, amount) in storage.load_escrows()? {
            self.escrow.restore_escrow(session_id, amount);
        }
        let sessions = storage.load_sessions()?;
        let restored = sessions.len();
        for entry in sessions {
            self.manager.ledger().restore(entry);
        }
        tracing::info!(sessions = restored, "ledger restored");

        if storage.get_state(GENESIS_KEY)?.is_none() {
            let mut balances: Vec<(AccountId, u64)> = Vec::with_capacity(self.config.genesis.len());
            for genesis in &self.config.genesis {
                match balances.iter_mut().find(|(account, _)| account == &genesis.account) {
                    Some((_, balance)) => *balance = balance.saturating_add(genesis.balance),
                    None => balances.push((
                        genesis.account.clone(),
                        self.escrow.balance(&genesis.account).saturating_add(genesis.balance),
                    )),
                }
            }
            // The marker must land in the same batch as the balances it guards.
            storage.persist(&Snapshot {
                balances: balances.clone(),
                state: vec![(GENESIS_KEY.to_string(), b"1".to_vec())],
                ..Snapshot::default()
            })?;
            for (account, balance) in balances {
                self.escrow.restore_balance(account, balance);
            }
            tracing::info!(accounts = self.config.genesis.len(), "genesis balances applied");
        }

        self.storage = Some(storage);
        Ok(())
    }

    /// Open storage and start the HTTP API.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting vpnpay node");
        self.open_storage()?;

        let (command_tx, command_rx) = mpsc::channel::<NodeCommand>(256);
        let node_state = Arc::new(NodeState::new(self.manager.clone(), command_tx));

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let api_state = node_state.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(api_addr, api_state).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        });

        self.node_state = Some(node_state);
        self.command_rx = Some(command_rx);
        Ok(())
    }

    /// Run the node's main event loop until the command channel closes.
    pub async fn run(&mut self) -> Result<()> {
        let mut command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;

        tracing::info!("entering main event loop");

        while let Some(cmd) = command_rx.recv().await {
            match cmd {
                NodeCommand::Execute { command, reply } => {
                    let result = self.execute(command);
                    if reply.send(result).is_err() {
                        tracing::warn!("API handler dropped before reply");
                    }
                }
            }
        }

        tracing::info!("API command channel closed");
        Ok(())
    }

    /// Apply one command at the current time. Its changes reach storage
    /// before they are applied in memory, so a failed write leaves both
    /// untouched.
    pub fn execute(&self, command: Command) -> Result<CommandOutcome, SettlementError> {
        let name = command.name();
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| SettlementError::Internal("storage not open".into()))?;
        self.manager
            .dispatch_logged(command, Utc::now(), storage)
            .map_err(|e| {
                tracing::warn!(command = name, code = e.code(), error = %e, "command rejected");
                e
            })
    }

    /// Gracefully shut down the node.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down vpnpay node");

        self.node_state = None;
        self.command_rx = None;

        if let Some(storage) = self.storage.take() {
            drop(storage);
            tracing::info!("storage closed");
        }

        tracing::info!("vpnpay node shut down");
        Ok(())
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn escrow(&self) -> &Arc<InternalEscrow> {
        &self.escrow
    }
}
