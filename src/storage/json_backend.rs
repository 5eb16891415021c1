use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::PersistenceProvider;
use crate::errors::{StorageError, StorageResult};
use crate::ledger::Entry;

/// File name used when the store lives inside a data directory.
pub const LEDGER_FILE: &str = "ledger.json";
const CURRENT_SCHEMA_VERSION: u8 = 1;
const TMP_SUFFIX: &str = "tmp";
const CORRUPT_SUFFIX: &str = "corrupt";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLedger {
    #[serde(default = "schema_version_default")]
    schema_version: u8,
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredLedgerRef<'a> {
    schema_version: u8,
    entries: &'a [Entry],
}

fn schema_version_default() -> u8 {
    CURRENT_SCHEMA_VERSION
}

/// Blob-style provider: the whole collection is serialized into one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self::new(dir.join(LEDGER_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceProvider for JsonFileStore {
    fn load(&self) -> StorageResult<Vec<Entry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let stored: StoredLedger = serde_json::from_str(&data)?;
        if stored.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::Corrupt(format!(
                "ledger schema v{} is newer than supported v{}",
                stored.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(stored.entries)
    }

    fn save(&self, entries: &[Entry]) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(&StoredLedgerRef {
            schema_version: CURRENT_SCHEMA_VERSION,
            entries,
        })?;
        let tmp = sibling_path(&self.path, TMP_SUFFIX);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }

    fn quarantine(&self) -> StorageResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut target = sibling_path(&self.path, CORRUPT_SUFFIX);
        let mut attempt = 1;
        while target.exists() {
            target = sibling_path(&self.path, &format!("{CORRUPT_SUFFIX}.{attempt}"));
            attempt += 1;
        }
        fs::rename(&self.path, &target)?;
        tracing::warn!(
            from = %self.path.display(),
            to = %target.display(),
            "unreadable ledger file moved aside"
        );
        Ok(Some(target.display().to_string()))
    }
}

/// `ledger.json` -> `ledger.json.<suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{suffix}"),
        None => suffix.to_string(),
    };
    sibling.set_extension(ext);
    sibling
}

fn write_atomic(path: &Path, data: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EntryKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn store_with_temp_dir() -> (JsonFileStore, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonFileStore::in_dir(temp.path()).expect("json store");
        (store, temp)
    }

    #[test]
    fn missing_file_loads_as_empty_ledger() {
        let (store, _guard) = store_with_temp_dir();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip_preserves_order() {
        let (store, _guard) = store_with_temp_dir();
        let date = NaiveDate::from_ymd_opt(2024, 4, 4).unwrap();
        let first = Entry::new(date, EntryKind::Credit, "first", dec!(10)).unwrap();
        let second = Entry::new(date, EntryKind::Debit, "second", dec!(3.5)).unwrap();
        store.save(&[first.clone(), second.clone()]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first.id);
        assert_eq!(loaded[1].amount, dec!(3.5));
        assert!(!sibling_path(store.path(), TMP_SUFFIX).exists());
    }

    #[test]
    fn rejects_future_schema_versions() {
        let (store, _guard) = store_with_temp_dir();
        fs::write(store.path(), r#"{"schemaVersion": 9, "entries": []}"#).unwrap();
        let err = store.load().expect_err("future schema must fail");
        assert!(matches!(err, StorageError::Corrupt(ref message) if message.contains("newer")));
    }

    #[test]
    fn quarantine_moves_unreadable_files_without_clobbering_older_copies() {
        let (store, temp) = store_with_temp_dir();
        assert_eq!(store.quarantine().unwrap(), None);

        fs::write(store.path(), "{ first").unwrap();
        let first = store.quarantine().unwrap().expect("moved");
        fs::write(store.path(), "{ second").unwrap();
        let second = store.quarantine().unwrap().expect("moved");

        assert!(first.ends_with("ledger.json.corrupt"));
        assert!(second.ends_with("ledger.json.corrupt.1"));
        assert!(!store.path().exists());
        let kept = fs::read_to_string(temp.path().join("ledger.json.corrupt")).unwrap();
        assert_eq!(kept, "{ first");
        assert!(store.load().unwrap().is_empty());
    }
}
