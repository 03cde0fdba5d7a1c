use std::path::PathBuf;

use thiserror::Error;

use crate::store::EntityStore;

pub mod in_memory;
pub mod json_file;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed ledger document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Storage rejected the write: {0}")]
    Rejected(String),
}

/// Where the ledger document lives between runs.
///
/// `save` always receives the complete store and replaces whatever was
/// stored before.
pub trait LedgerStorage {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<EntityStore>, PersistenceError>;

    fn save(&self, store: &EntityStore) -> Result<(), PersistenceError>;
}

/// Blank input counts as "no document".
pub(crate) fn decode(content: &str) -> Result<Option<EntityStore>, PersistenceError> {
    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(content)?))
}

pub(crate) fn encode(store: &EntityStore) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(store)?)
}
