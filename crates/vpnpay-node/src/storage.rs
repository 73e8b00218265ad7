//! RocksDB storage backend for the vpnpay node.

use anyhow::Result;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use vpnpay_core::{AccountId, SessionId};
use vpnpay_settlement::{CommitLog, PendingCommit, SessionLedgerEntry, SettlementError};

/// Column family names for different data types.
const CF_SESSIONS: &str = "sessions";
const CF_BALANCES: &str = "balances";
const CF_ESCROWS: &str = "escrows";
const CF_STATE: &str = "state";

/// Everything one operation writes, applied as a single batch.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub entry: Option<SessionLedgerEntry>,
    pub balances: Vec<(AccountId, u64)>,
    pub escrow: Option<(SessionId, u64)>,
    /// Node state keys written alongside, e.g. the genesis marker.
    pub state: Vec<(String, Vec<u8>)>,
}

/// RocksDB-backed storage for the vpnpay node.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_BALANCES, Options::default()),
            ColumnFamilyDescriptor::new(CF_ESCROWS, Options::default()),
            ColumnFamilyDescriptor::new(CF_STATE, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, cf_name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))
    }

    /// Get a value from a column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get_cf(self.cf(cf_name)?, key)?)
    }

    fn scan(&self, cf_name: &str) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            out.push(item?);
        }
        Ok(out)
    }

    /// Write a session entry, its balances, its escrow, and any state keys
    /// in one batch.
    pub fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let mut batch = WriteBatch::default();

        if let Some(entry) = &snapshot.entry {
            batch.put_cf(
                self.cf(CF_SESSIONS)?,
                entry.session_id.as_bytes(),
                serde_json::to_vec(entry)?,
            );
        }
        let balances = self.cf(CF_BALANCES)?;
        for (account, amount) in &snapshot.balances {
            batch.put_cf(balances, account.as_str().as_bytes(), amount.to_be_bytes());
        }
        if let Some((session_id, amount)) = &snapshot.escrow {
            let escrows = self.cf(CF_ESCROWS)?;
            if *amount == 0 {
                batch.delete_cf(escrows, session_id.as_bytes());
            } else {
                batch.put_cf(escrows, session_id.as_bytes(), amount.to_be_bytes());
            }
        }
        if !snapshot.state.is_empty() {
            let state = self.cf(CF_STATE)?;
            for (key, value) in &snapshot.state {
                batch.put_cf(state, key.as_bytes(), value);
            }
        }

        self.db.write(batch)?;
        Ok(())
    }

    /// All persisted session entries.
    pub fn load_sessions(&self) -> Result<Vec<SessionLedgerEntry>> {
        self.scan(CF_SESSIONS)?
            .into_iter()
            .map(|(_, value)| -> Result<SessionLedgerEntry> { Ok(serde_json::from_slice(&value)?) })
            .collect()
    }

    /// All persisted account balances.
    pub fn load_balances(&self) -> Result<Vec<(AccountId, u64)>> {
        self.scan(CF_BALANCES)?
            .into_iter()
            .map(|(key, value)| -> Result<(AccountId, u64)> {
                let account = AccountId::new(String::from_utf8(key.into_vec())?)?;
                Ok((account, decode_u64(&value)?))
            })
            .collect()
    }

    /// All persisted non-empty escrows.
    pub fn load_escrows(&self) -> Result<Vec<(SessionId, u64)>> {
        self.scan(CF_ESCROWS)?
            .into_iter()
            .map(|(key, value)| -> Result<(SessionId, u64)> {
                Ok((SessionId::from_bytes(key.into_vec()), decode_u64(&value)?))
            })
            .collect()
    }

    /// Get node state.
    pub fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get(CF_STATE, key.as_bytes())
    }
}

impl CommitLog for Storage {
    fn write(&self, commit: &PendingCommit) -> Result<(), SettlementError> {
        self.persist(&Snapshot {
            entry: Some(commit.entry.clone()),
            balances: commit.balances.clone(),
            escrow: Some((commit.entry.session_id.clone(), commit.escrowed)),
            state: Vec::new(),
        })
        .map_err(|e| SettlementError::Internal(format!("persist failed: {}", e)))
    }
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected 8-byte amount, got {} bytes", bytes.len()))?;
    Ok(u64::from_be_bytes(arr))
}
