use std::sync::Mutex;

use super::PersistenceProvider;
use crate::errors::{StorageError, StorageResult};
use crate::ledger::Entry;

/// Volatile provider, optionally bounded by a byte quota on the serialized
/// collection (the way browser key-value storage is).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<Entry>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Copy of the last successfully saved collection.
    pub fn saved(&self) -> Vec<Entry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl PersistenceProvider for MemoryStore {
    fn load(&self) -> StorageResult<Vec<Entry>> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| StorageError::Corrupt("memory store lock poisoned".into()))
    }

    fn save(&self, entries: &[Entry]) -> StorageResult<()> {
        if let Some(quota) = self.quota {
            let required = serde_json::to_vec(entries)?.len();
            if required > quota {
                return Err(StorageError::QuotaExceeded { required, quota });
            }
        }
        let mut stored = self
            .entries
            .lock()
            .map_err(|_| StorageError::Corrupt("memory store lock poisoned".into()))?;
        *stored = entries.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        match self.quota {
            Some(quota) => format!("memory store ({quota} byte quota)"),
            None => "memory store".to_string(),
        }
    }
}
