//! Local wallet file holding per-session keys and issuer state.
//!
//! The session secret never leaves this file; the node only ever sees the
//! public half.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use vpnpay_core::{SessionId, SignedVoucher};
use vpnpay_crypto::KeyPair;
use vpnpay_settlement::{IssuerState, VoucherIssuer};

pub const DEFAULT_WALLET: &str = "vpnpay-wallet.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSession {
    /// Hex Ed25519 seed of the session key.
    pub secret_key: String,
    pub issuer: IssuerState,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(skip)]
    path: PathBuf,
    /// Sessions keyed by hex session id.
    #[serde(default)]
    sessions: BTreeMap<String, WalletSession>,
}

impl Wallet {
    /// Load a wallet, or start an empty one if the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut wallet: Wallet = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        } else {
            Wallet::default()
        };
        wallet.path = path.to_path_buf();
        Ok(wallet)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies when the file is created.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Record a freshly opened session.
    pub fn add_session(&mut self, keypair: &KeyPair, session_id: SessionId, collateral: u64) {
        let key = session_id.to_hex();
        self.sessions.insert(
            key,
            WalletSession {
                secret_key: keypair.secret_hex().to_string(),
                issuer: IssuerState::new(session_id, collateral),
            },
        );
    }

    pub fn session(&self, session_id: &SessionId) -> anyhow::Result<&WalletSession> {
        self.sessions
            .get(&session_id.to_hex())
            .ok_or_else(|| anyhow::anyhow!("session {} not in wallet {}", session_id, self.path.display()))
    }

    /// Issue a voucher for `session_id` and record the new issuer state.
    ///
    /// `counter` defaults to one past the last issued counter.
    pub fn issue(
        &mut self,
        session_id: &SessionId,
        amount: u64,
        counter: Option<u64>,
        is_final: bool,
    ) -> anyhow::Result<SignedVoucher> {
        let stored = self.session(session_id)?;
        let keypair = KeyPair::from_secret_hex(&stored.secret_key)?;
        let mut issuer = VoucherIssuer::resume(stored.issuer.clone(), keypair);

        let counter = match counter {
            Some(c) => c,
            None => issuer.next_counter()?,
        };
        let signed = issuer.issue(amount, counter, is_final)?;

        if let Some(entry) = self.sessions.get_mut(&session_id.to_hex()) {
            entry.issuer = issuer.into_state();
        }
        Ok(signed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
