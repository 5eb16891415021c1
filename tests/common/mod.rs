#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::NaiveDate;
use extrato_core::{
    storage::{MemoryStore, PersistenceProvider},
    time::FixedClock,
    EntryDraft, LedgerStore,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates an isolated data directory that outlives the calling test.
pub fn temp_data_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// "Today" for every store built by these helpers.
pub fn today() -> NaiveDate {
    date(2024, 12, 1)
}

pub fn store_with(provider: Box<dyn PersistenceProvider>) -> LedgerStore {
    LedgerStore::open(provider, Box::new(FixedClock::on(today()))).expect("open ledger store")
}

pub fn memory_store() -> LedgerStore {
    store_with(Box::new(MemoryStore::new()))
}

pub fn draft(date: &str, kind: &str, description: &str, amount: &str) -> EntryDraft {
    EntryDraft::new(date, kind, description, amount)
}
