use std::sync::Arc;

use parking_lot::Mutex;

use super::{LedgerStorage, PersistenceError, decode, encode};
use crate::store::EntityStore;

/// Keeps the serialized document in memory.
///
/// Clones share the same document, so a handle kept outside the ledger can
/// inspect what was saved. Saves can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<InMemoryDocument>>,
}

#[derive(Debug, Default)]
struct InMemoryDocument {
    content: Option<String>,
    fail_saves: bool,
    saves: usize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(content: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.inner.lock().content = Some(content.into());
        storage
    }

    /// Last saved (or seeded) document text.
    pub fn document(&self) -> Option<String> {
        self.inner.lock().content.clone()
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }

    pub fn fail_saves(&self, fail: bool) {
        self.inner.lock().fail_saves = fail;
    }
}

impl LedgerStorage for InMemoryStorage {
    fn load(&self) -> Result<Option<EntityStore>, PersistenceError> {
        match &self.inner.lock().content {
            Some(content) => decode(content),
            None => Ok(None),
        }
    }

    fn save(&self, store: &EntityStore) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        if inner.fail_saves {
            return Err(PersistenceError::Rejected(
                "in-memory storage is failing saves".to_string(),
            ));
        }
        inner.content = Some(encode(store)?);
        inner.saves += 1;
        Ok(())
    }
}
