//! Embedded transactional store.
//!
//! One `sled` database per process, opened once at startup. Guild settings
//! live in the `guilds` tree; each guild's trials live in their own
//! `trials/<guild>` tree, so tenant enumeration never scans other tenants.
//!
//! The store enforces a single global write slot: a writable transaction
//! holds a process-wide mutex until it commits or drops, while read-only
//! transactions run freely against the last-committed state. Writes buffer
//! inside the transaction and land atomically as one batch on commit;
//! dropping a transaction without committing discards them.

mod codec;
mod guilds;
mod trials;

pub use guilds::{GuildApi, GuildRecord, GuildTx};
pub use trials::{TrialApi, TrialScan, TrialTx};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use tracing::debug;

use crate::error::{Result, SignupError};

const GUILDS_TREE: &str = "guilds";

type WriterGuard = ArcMutexGuard<RawMutex, ()>;

/// Process-wide store handle. Cheap to clone; all transaction APIs derive
/// from it.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    writer_slot: Arc<Mutex<()>>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Store {
            db,
            writer_slot: Arc::new(Mutex::new(())),
        })
    }

    /// In-memory store for tests; nothing touches disk.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Store {
            db,
            writer_slot: Arc::new(Mutex::new(())),
        })
    }

    /// The guild settings API.
    pub fn guilds(&self) -> GuildApi {
        GuildApi::new(self.db.clone(), self.writer_slot.clone())
    }

    /// The trial API scoped to one guild's namespace.
    pub fn trials(&self, guild_id: &str) -> TrialApi {
        TrialApi::new(self.db.clone(), self.writer_slot.clone(), guild_id)
    }
}

enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// Shared transaction core over one tree. Writable transactions own the
/// global writer slot for their whole lifetime; pending writes overlay the
/// tree for read-your-writes.
pub(crate) struct Tx {
    tree: sled::Tree,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    state: TxState,
    writer: Option<WriterGuard>,
}

impl Tx {
    /// Open a transaction. Blocks while another writable transaction holds
    /// the writer slot.
    fn begin(tree: sled::Tree, slot: &Arc<Mutex<()>>, writable: bool) -> Tx {
        let writer = writable.then(|| slot.lock_arc());
        Tx {
            tree,
            pending: BTreeMap::new(),
            state: TxState::Active,
            writer,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            TxState::Active => Ok(()),
            _ => Err(SignupError::TransactionClosed),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_active()?;
        if self.writer.is_none() {
            return Err(SignupError::ReadOnlyTransaction);
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_active()?;
        if let Some(value) = self.pending.get(key) {
            return Ok(value.clone());
        }
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.ensure_writable()?;
        self.pending.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.ensure_writable()?;
        self.pending.insert(key, None);
        Ok(())
    }

    /// Every live entry, committed state merged with this transaction's
    /// pending writes, in key order.
    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_active()?;

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            merged.insert(key.to_vec(), value.to_vec());
        }
        for (key, value) in &self.pending {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    /// Apply the pending writes atomically and release the writer slot.
    /// Committing twice, or after rollback, is an error.
    fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;

        if self.writer.is_some() && !self.pending.is_empty() {
            let mut batch = sled::Batch::default();
            for (key, value) in std::mem::take(&mut self.pending) {
                match value {
                    Some(value) => batch.insert(key, value),
                    None => batch.remove(key),
                }
            }
            self.tree.apply_batch(batch)?;
            self.tree.flush()?;
        }

        self.state = TxState::Committed;
        self.writer = None;
        Ok(())
    }

    /// Discard pending writes and release the writer slot. Calling this on
    /// an already-closed transaction is a no-op, not an error, so callers
    /// can roll back unconditionally on every exit path.
    fn rollback(&mut self) -> Result<()> {
        if let TxState::Active = self.state {
            if !self.pending.is_empty() {
                debug!(discarded = self.pending.len(), "rolling back transaction");
            }
            self.pending.clear();
            self.state = TxState::RolledBack;
            self.writer = None;
        }
        Ok(())
    }
}
