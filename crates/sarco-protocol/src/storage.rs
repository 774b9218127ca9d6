//! Snapshot storage
//!
//! Persists the protocol state (and, for in-memory deployments, the token
//! ledger) as pretty JSON under a data directory.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::ledger::MemoryLedger;
use crate::store::ProtocolState;

/// File-backed protocol snapshots
pub struct SnapshotStorage {
    base_path: PathBuf,
}

impl SnapshotStorage {
    /// Open (creating if needed) a storage directory
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn has_state(&self) -> bool {
        self.state_path().exists()
    }

    /// Load the state, or `None` when no snapshot has been written
    pub fn load_state(&self) -> Result<Option<ProtocolState>> {
        read_json(&self.state_path())
    }

    pub fn save_state(&self, state: &ProtocolState) -> Result<()> {
        write_json(&self.state_path(), state)
    }

    /// Load the ledger; an absent file is an empty ledger
    pub fn load_ledger(&self) -> Result<MemoryLedger> {
        Ok(read_json(&self.ledger_path())?.unwrap_or_default())
    }

    pub fn save_ledger(&self, ledger: &MemoryLedger) -> Result<()> {
        write_json(&self.ledger_path(), ledger)
    }

    pub fn state_path(&self) -> PathBuf {
        self.base_path.join("state.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.base_path.join("ledger.json")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;

    // Write to temp file first, then rename
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content)?;
    std::fs::rename(&temp_path, path)?;

    debug!("Wrote snapshot {:?}", path);
    Ok(())
}
