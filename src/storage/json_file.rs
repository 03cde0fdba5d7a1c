use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{LedgerStorage, PersistenceError, decode, encode};
use crate::store::EntityStore;

/// The ledger document as a JSON file.
///
/// Saves go to a temporary file next to the target, which is then renamed
/// over it, so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl LedgerStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<EntityStore>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => decode(&content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&self, store: &EntityStore) -> Result<(), PersistenceError> {
        let content = encode(store)?;
        let mut file = NamedTempFile::new_in(self.directory()).map_err(|e| self.io_error(e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.as_file().sync_all().map_err(|e| self.io_error(e))?;
        file.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        debug!("Ledger saved to {}", self.path.display());
        Ok(())
    }
}
