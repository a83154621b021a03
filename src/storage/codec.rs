//! Record codec: persisted entities to and from bytes. Pure, no I/O.
//!
//! Records are serde-encoded with field-name keying and defaulted fields, so
//! fields can be added (or removed) without breaking older records.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SignupError};
use crate::models::{GuildSettings, Trial};

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|source| SignupError::Encode { source })
}

fn decode<T: DeserializeOwned>(bytes: &[u8], key: &str) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| SignupError::CorruptRecord {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn decode_settings(bytes: &[u8], key: &str) -> Result<GuildSettings> {
    decode(bytes, key)
}

pub(crate) fn decode_trial(bytes: &[u8], key: &str) -> Result<Trial> {
    let mut trial: Trial = decode(bytes, key)?;
    // Records are written sorted, but the invariant is re-established on
    // read in case the bytes came from elsewhere.
    trial.sort_role_counts();
    Ok(trial)
}
