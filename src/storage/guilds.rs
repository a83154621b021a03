//! Guild settings storage: one record per guild in a shared tree.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{codec, Tx, GUILDS_TREE};
use crate::error::Result;
use crate::models::GuildSettings;

/// A guild's settings together with its storage identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildRecord {
    pub guild_id: String,
    pub settings: GuildSettings,
}

#[derive(Clone)]
pub struct GuildApi {
    db: sled::Db,
    writer_slot: Arc<Mutex<()>>,
}

impl GuildApi {
    pub(crate) fn new(db: sled::Db, writer_slot: Arc<Mutex<()>>) -> Self {
        GuildApi { db, writer_slot }
    }

    /// Open a store-wide transaction. A writable transaction blocks until
    /// any other writer finishes.
    pub fn transaction(&self, writable: bool) -> Result<GuildTx> {
        let tree = self.db.open_tree(GUILDS_TREE)?;
        Ok(GuildTx {
            tx: Tx::begin(tree, &self.writer_slot, writable),
        })
    }
}

pub struct GuildTx {
    tx: Tx,
}

impl GuildTx {
    /// Fetch a guild's settings, materializing a default record if the guild
    /// has never been seen. Absence is not an error.
    pub fn add_guild(&self, guild_id: &str) -> Result<GuildRecord> {
        let settings = match self.tx.get(guild_id.as_bytes())? {
            Some(bytes) => codec::decode_settings(&bytes, guild_id)?,
            None => GuildSettings::default(),
        };

        Ok(GuildRecord {
            guild_id: guild_id.to_string(),
            settings,
        })
    }

    pub fn save_guild(&mut self, record: &GuildRecord) -> Result<()> {
        let bytes = codec::encode(&record.settings)?;
        self.tx.put(record.guild_id.as_bytes().to_vec(), bytes)
    }

    /// Every known guild id, for cross-guild reporting.
    pub fn all_guilds(&self) -> Result<Vec<String>> {
        let entries = self.tx.entries()?;
        Ok(entries
            .into_iter()
            .map(|(key, _)| String::from_utf8_lossy(&key).into_owned())
            .collect())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.tx.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.tx.rollback()
    }
}
