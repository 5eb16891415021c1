//! Interchangeable persistence providers for the entry collection.

pub mod json_backend;
pub mod memory_backend;
pub mod sqlite_backend;

use std::{fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::StorageResult;
use crate::ledger::Entry;

pub use json_backend::{JsonFileStore, LEDGER_FILE};
pub use memory_backend::MemoryStore;
pub use sqlite_backend::{SqliteStore, SQLITE_FILE};

/// Durable store of the ordered entry collection.
///
/// Core logic never knows which implementation is active.
pub trait PersistenceProvider: Send + Sync {
    /// Returns the persisted entries in ledger order, or an empty collection.
    fn load(&self) -> StorageResult<Vec<Entry>>;

    /// Replaces the persisted collection with `entries`.
    fn save(&self, entries: &[Entry]) -> StorageResult<()>;

    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    /// Moves unreadable persisted data aside so the next save cannot overwrite
    /// it. Returns where the data went, or `None` when there was nothing to move.
    fn quarantine(&self) -> StorageResult<Option<String>> {
        Ok(None)
    }
}

/// Selects which provider a session persists to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Json,
    Sqlite,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendKind::Json => "json",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        };
        f.write_str(label)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(BackendKind::Json),
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown storage backend `{other}`")),
        }
    }
}

/// Opens the provider for `kind`, keeping its files under `data_dir`.
pub fn open_backend(
    kind: BackendKind,
    data_dir: &Path,
) -> StorageResult<Box<dyn PersistenceProvider>> {
    let provider: Box<dyn PersistenceProvider> = match kind {
        BackendKind::Json => Box::new(JsonFileStore::in_dir(data_dir)?),
        BackendKind::Sqlite => {
            fs::create_dir_all(data_dir)?;
            Box::new(SqliteStore::open(&data_dir.join(SQLITE_FILE))?)
        }
        BackendKind::Memory => Box::new(MemoryStore::new()),
    };
    tracing::debug!(backend = %kind, target = %provider.describe(), "persistence provider opened");
    Ok(provider)
}
