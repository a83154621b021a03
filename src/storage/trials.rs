//! Trial storage: many records per guild, each guild in its own tree.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::{codec, Tx};
use crate::error::{Result, SignupError};
use crate::models::Trial;

/// Result of a best-effort enumeration: decoded trials plus how many stored
/// records failed to decode and were skipped.
#[derive(Debug, Default)]
pub struct TrialScan {
    pub trials: Vec<Trial>,
    pub corrupt: usize,
}

#[derive(Clone)]
pub struct TrialApi {
    db: sled::Db,
    writer_slot: Arc<Mutex<()>>,
    guild_id: String,
}

impl TrialApi {
    pub(crate) fn new(db: sled::Db, writer_slot: Arc<Mutex<()>>, guild_id: &str) -> Self {
        TrialApi {
            db,
            writer_slot,
            guild_id: guild_id.to_lowercase(),
        }
    }

    /// Open a transaction against this guild's namespace. The namespace is
    /// created lazily on first write, so pure reads leave the store alone.
    pub fn transaction(&self, writable: bool) -> Result<TrialTx> {
        let tree = self.db.open_tree(format!("trials/{}", self.guild_id))?;
        Ok(TrialTx {
            tx: Tx::begin(tree, &self.writer_slot, writable),
            guild_id: self.guild_id.clone(),
        })
    }
}

pub struct TrialTx {
    tx: Tx,
    guild_id: String,
}

impl TrialTx {
    /// Get-or-create, keyed by the lower-cased name. Never duplicates: two
    /// names differing only in case resolve to the same record.
    pub fn add_trial(&self, name: &str) -> Result<Trial> {
        match self.get_trial(name) {
            Ok(trial) => Ok(trial),
            Err(SignupError::TrialNotExist { .. }) => Ok(Trial::new(name)),
            Err(err) => Err(err),
        }
    }

    /// Absence and corruption are distinct failures: a record that exists
    /// but does not decode is never reported as missing.
    pub fn get_trial(&self, name: &str) -> Result<Trial> {
        let key = name.to_lowercase();
        match self.tx.get(key.as_bytes())? {
            Some(bytes) => codec::decode_trial(&bytes, &key),
            None => Err(SignupError::TrialNotExist {
                name: name.to_string(),
            }),
        }
    }

    pub fn save_trial(&mut self, trial: &Trial) -> Result<()> {
        let bytes = codec::encode(trial)?;
        self.tx.put(trial.key().into_bytes(), bytes)
    }

    /// Deleting a name that does not exist is a reported error, not a silent
    /// success.
    pub fn delete_trial(&mut self, name: &str) -> Result<()> {
        self.get_trial(name)?;
        self.tx.delete(name.to_lowercase().into_bytes())
    }

    /// Every trial in this guild's namespace. Enumeration is best-effort: a
    /// single corrupt record must not abort listing of the rest.
    pub fn trials(&self) -> Result<Vec<Trial>> {
        Ok(self.scan_trials()?.trials)
    }

    /// Like [`trials`](Self::trials), but exposing the corrupt-record skip
    /// count.
    pub fn scan_trials(&self) -> Result<TrialScan> {
        let mut scan = TrialScan::default();

        for (key, value) in self.tx.entries()? {
            let key = String::from_utf8_lossy(&key).into_owned();
            match codec::decode_trial(&value, &key) {
                Ok(trial) => scan.trials.push(trial),
                Err(err) => {
                    warn!(
                        guild_id = %self.guild_id,
                        key = %key,
                        error = %err,
                        "skipping corrupt trial record"
                    );
                    scan.corrupt += 1;
                }
            }
        }

        Ok(scan)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.tx.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.tx.rollback()
    }
}
