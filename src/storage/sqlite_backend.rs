use std::{
    path::Path,
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::PersistenceProvider;
use crate::errors::{StorageError, StorageResult};
use crate::ledger::{Entry, EntryKind, DATE_FORMAT};

/// File name used when the database lives inside a data directory.
pub const SQLITE_FILE: &str = "ledger.sqlite3";

/// Row-oriented provider backed by an embedded SQLite database.
///
/// Ledger order is kept through insertion order (`rowid`), which makes
/// date ties survive a round-trip.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    label: String,
}

struct EntryRow {
    id: String,
    date: String,
    kind: String,
    description: String,
    amount: String,
    selected: bool,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::with_connection(conn, path.display().to_string())
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, label: String) -> StorageResult<Self> {
        setup_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            label,
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Corrupt("sqlite connection lock poisoned".into()))
    }
}

fn setup_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            selected INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    Ok(())
}

impl PersistenceProvider for SqliteStore {
    fn load(&self) -> StorageResult<Vec<Entry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, kind, description, amount, selected FROM entries ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EntryRow {
                id: row.get(0)?,
                date: row.get(1)?,
                kind: row.get(2)?,
                description: row.get(3)?,
                amount: row.get(4)?,
                selected: row.get::<_, i64>(5)? != 0,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    fn save(&self, entries: &[Entry]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (id, date, kind, description, amount, selected)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.id.to_string(),
                    entry.date.format(DATE_FORMAT).to_string(),
                    entry.kind.as_str(),
                    entry.description,
                    entry.amount.to_string(),
                    entry.selected as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite database {}", self.label)
    }

    fn quarantine(&self) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let table = format!("entries_corrupt_{}", Utc::now().format("%Y%m%d%H%M%S%3f"));
        conn.execute_batch(&format!("ALTER TABLE entries RENAME TO {table}"))?;
        setup_schema(&conn)?;
        tracing::warn!(database = %self.label, %table, "unreadable rows moved aside");
        Ok(Some(format!("table {table} of {}", self.label)))
    }
}

impl EntryRow {
    fn into_entry(self) -> StorageResult<Entry> {
        let corrupt = |field: &str, value: &str| {
            StorageError::Corrupt(format!("row {} has invalid {field} `{value}`", self.id))
        };
        let id = Uuid::parse_str(&self.id).map_err(|_| corrupt("id", &self.id))?;
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|_| corrupt("date", &self.date))?;
        let kind = match self.kind.as_str() {
            "entrada" => EntryKind::Credit,
            "saida" => EntryKind::Debit,
            other => return Err(corrupt("kind", other)),
        };
        let amount =
            Decimal::from_str(&self.amount).map_err(|_| corrupt("amount", &self.amount))?;
        Ok(Entry {
            id,
            date,
            kind,
            description: self.description,
            amount,
            running_balance: Decimal::ZERO,
            selected: self.selected,
        })
    }
}
