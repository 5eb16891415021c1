mod common;

use std::fs;

use common::{draft, store_with, temp_data_dir, today};
use extrato_core::{
    storage::{
        open_backend, BackendKind, JsonFileStore, MemoryStore, PersistenceProvider, SqliteStore,
        SQLITE_FILE,
    },
    time::FixedClock,
    LedgerError, LedgerStore, StorageError,
};

fn store_with_result(provider: Box<dyn PersistenceProvider>) -> extrato_core::Result<LedgerStore> {
    LedgerStore::open(provider, Box::new(FixedClock::on(today())))
}
use rust_decimal_macros::dec;

fn populate(kind: BackendKind, dir: &std::path::Path) {
    let mut store = store_with(open_backend(kind, dir).unwrap());
    store
        .add(draft("2024-11-02", "saida", "Groceries", "30,25"))
        .unwrap()
        .status
        .into_result()
        .unwrap();
    let salary = store
        .add(draft("2024-11-01", "entrada", "Salary", "100"))
        .unwrap()
        .value;
    store.toggle_selection(salary).unwrap();
}

#[test]
fn json_and_sqlite_backends_reload_the_same_ledger() {
    for kind in [BackendKind::Json, BackendKind::Sqlite] {
        let dir = temp_data_dir();
        populate(kind, &dir);

        let reopened = store_with(open_backend(kind, &dir).unwrap());
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.entries.len(), 2, "{kind}");
        assert_eq!(snapshot.entries[0].description, "Salary");
        assert!(snapshot.entries[0].selected);
        assert_eq!(snapshot.entries[1].amount, dec!(30.25));
        assert_eq!(snapshot.balance, dec!(69.75));
        assert_eq!(snapshot.selected_count, 1);
    }
}

#[test]
fn json_file_never_stores_running_balances() {
    let dir = temp_data_dir();
    populate(BackendKind::Json, &dir);
    let store = JsonFileStore::in_dir(&dir).unwrap();
    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"schemaVersion\": 1"));
    assert!(raw.contains("\"kind\": \"entrada\""));
    assert!(!raw.contains("running"));
}

#[test]
fn corrupt_json_file_is_moved_aside_and_the_store_starts_empty() {
    let dir = temp_data_dir();
    let provider = JsonFileStore::in_dir(&dir).unwrap();
    let path = provider.path().to_path_buf();
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        store_with_result(Box::new(provider.clone())),
        Err(LedgerError::Persistence(StorageError::Serde(_)))
    ));

    let (mut store, recovery) = LedgerStore::open_or_recover(
        Box::new(provider),
        Box::new(FixedClock::on(today())),
    );
    let recovery = recovery.expect("recovery reported");
    assert!(store.ledger().is_empty());
    assert!(!recovery.volatile);
    assert_eq!(
        fs::read_to_string(dir.join("ledger.json.corrupt")).unwrap(),
        "{ not json"
    );

    store
        .add(draft("2024-11-01", "entrada", "Fresh start", "5"))
        .unwrap()
        .status
        .into_result()
        .unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("ledger.json.corrupt")).unwrap(),
        "{ not json"
    );
    assert!(fs::read_to_string(&path).unwrap().contains("Fresh start"));
}

#[test]
fn stored_amounts_that_cannot_be_balanced_are_treated_as_corrupt() {
    let dir = temp_data_dir();
    let provider = JsonFileStore::in_dir(&dir).unwrap();
    let max = "79228162514264337593543950335";
    fs::write(
        provider.path(),
        format!(
            r#"{{"schemaVersion": 1, "entries": [
                {{"id": "6f1c1c1e-8f0a-4c4e-9d55-0d3c6a9b8f10", "date": "2024-01-01", "kind": "entrada", "description": "a", "amount": {max}}},
                {{"id": "6f1c1c1e-8f0a-4c4e-9d55-0d3c6a9b8f11", "date": "2024-01-02", "kind": "entrada", "description": "b", "amount": {max}}}
            ]}}"#
        ),
    )
    .unwrap();

    assert!(matches!(
        store_with_result(Box::new(provider)),
        Err(LedgerError::Persistence(StorageError::Corrupt(_)))
    ));
}

#[test]
fn json_store_keeps_large_and_fine_grained_amounts_exact() {
    let dir = temp_data_dir();
    let mut store = store_with(open_backend(BackendKind::Json, &dir).unwrap());
    for (day, amount) in [
        ("2024-01-01", "1000000000000000.01"),
        ("2024-01-02", "0.123456789"),
    ] {
        store
            .add(draft(day, "entrada", "Exact", amount))
            .unwrap()
            .status
            .into_result()
            .unwrap();
    }

    let reopened = store_with(open_backend(BackendKind::Json, &dir).unwrap());
    let amounts: Vec<String> = reopened
        .ledger()
        .entries()
        .iter()
        .map(|entry| entry.amount.to_string())
        .collect();
    assert_eq!(amounts, ["1000000000000000.01", "0.123456789"]);
    assert_eq!(reopened.balance(), dec!(1000000000000000.133456789));
}

#[test]
fn sqlite_file_lives_in_the_data_dir() {
    let dir = temp_data_dir();
    let store = SqliteStore::open(&dir.join(SQLITE_FILE)).unwrap();
    let mut ledger = store_with(Box::new(store));
    ledger
        .add(draft("2024-01-01", "entrada", "Opening", "10"))
        .unwrap();
    assert!(dir.join(SQLITE_FILE).exists());
}

#[test]
fn quota_failures_keep_the_in_memory_change() {
    let mut store = store_with(Box::new(MemoryStore::new().with_quota(64)));
    let added = store
        .add(draft(
            "2024-11-01",
            "entrada",
            "A description long enough to blow the quota",
            "100",
        ))
        .unwrap();

    let err = added.status.into_result().unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Persistence(StorageError::QuotaExceeded { quota: 64, .. })
    ));
    assert_eq!(store.ledger().len(), 1);
    assert_eq!(store.balance(), dec!(100));
}

#[test]
fn json_backend_writes_atomically_into_the_data_dir() {
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    let home = assert_fs::TempDir::new().unwrap();
    populate(BackendKind::Json, home.path());

    home.child("ledger.json").assert(predicate::path::is_file());
    home.child("ledger.json.tmp")
        .assert(predicate::path::missing());
    home.child("ledger.json")
        .assert(predicate::str::contains("\"description\": \"Groceries\""));
}
