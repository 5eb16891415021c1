use chrono::Local;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::core::services::{
    BalanceTotals, ExportPayload, InterchangeService, StagedImport,
};
use crate::errors::{LedgerError, Result, StorageError};
use crate::ledger::{Entry, EntryDraft, Ledger};
use crate::storage::{MemoryStore, PersistenceProvider};
use crate::time::Clock;

/// Result of the save that follows every mutation.
///
/// A failed save never rolls back the in-memory change: the ledger held by the
/// store stays authoritative for the session.
#[must_use]
#[derive(Debug)]
pub enum SaveStatus {
    Saved,
    Failed(StorageError),
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            SaveStatus::Saved => Ok(()),
            SaveStatus::Failed(err) => Err(LedgerError::Persistence(err)),
        }
    }
}

/// Mutation result paired with the outcome of its save.
#[derive(Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub status: SaveStatus,
}

/// Read model handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    pub entries: Vec<Entry>,
    pub balance: Decimal,
    pub selected_count: usize,
}

/// Why a store started empty instead of with the persisted ledger.
#[derive(Debug)]
pub struct Recovery {
    pub error: LedgerError,
    /// Where the unreadable data was moved, when the provider could move it.
    pub moved_to: Option<String>,
    /// Set when changes of this session are kept in memory only.
    pub volatile: bool,
}

impl Recovery {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Saved ledger could not be read ({}); starting with an empty ledger",
            self.error
        );
        if let Some(target) = &self.moved_to {
            message.push_str(&format!(". The unreadable data was moved to {target}"));
        }
        if self.volatile {
            message.push_str(". Changes made in this session will not be saved");
        }
        message
    }
}

/// Owns the session ledger and persists it through an injected provider.
pub struct LedgerStore {
    ledger: Ledger,
    provider: Box<dyn PersistenceProvider>,
    clock: Box<dyn Clock>,
}

impl LedgerStore {
    /// Loads the persisted entries and rebuilds order and balances.
    pub fn open(provider: Box<dyn PersistenceProvider>, clock: Box<dyn Clock>) -> Result<Self> {
        let ledger = load_ledger(provider.as_ref())?;
        Ok(Self {
            ledger,
            provider,
            clock,
        })
    }

    /// Like [`Self::open`], but an unreadable store yields an empty ledger.
    ///
    /// The unreadable data is moved aside first. When that fails the store
    /// keeps working in memory so no save can overwrite what is still on disk.
    pub fn open_or_recover(
        provider: Box<dyn PersistenceProvider>,
        clock: Box<dyn Clock>,
    ) -> (Self, Option<Recovery>) {
        let error = match load_ledger(provider.as_ref()) {
            Ok(ledger) => {
                let store = Self {
                    ledger,
                    provider,
                    clock,
                };
                return (store, None);
            }
            Err(error) => error,
        };
        tracing::warn!(
            error = %error,
            provider = %provider.describe(),
            "persisted ledger unreadable; starting empty"
        );
        match provider.quarantine() {
            Ok(moved_to) => {
                let recovery = Recovery {
                    error,
                    moved_to,
                    volatile: false,
                };
                (Self::empty(provider, clock), Some(recovery))
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not move unreadable data aside");
                let recovery = Recovery {
                    error,
                    moved_to: None,
                    volatile: true,
                };
                (Self::empty(Box::new(MemoryStore::new()), clock), Some(recovery))
            }
        }
    }

    /// Starts with an empty ledger without reading the provider.
    pub fn empty(provider: Box<dyn PersistenceProvider>, clock: Box<dyn Clock>) -> Self {
        Self {
            ledger: Ledger::new(),
            provider,
            clock,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn balance(&self) -> Decimal {
        self.ledger.balance()
    }

    pub fn totals(&self) -> BalanceTotals {
        self.ledger.totals()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            entries: self.ledger.entries().to_vec(),
            balance: self.ledger.balance(),
            selected_count: self.ledger.selected_count(),
        }
    }

    /// Validates form input and inserts the resulting entry.
    pub fn add(&mut self, draft: EntryDraft) -> Result<Persisted<Uuid>> {
        let entry = draft.into_entry()?;
        self.add_entry(entry)
    }

    /// Inserts an already-typed entry after the same validation as [`Self::add`].
    pub fn add_entry(&mut self, entry: Entry) -> Result<Persisted<Uuid>> {
        entry.validate()?;
        let mut entry = entry;
        entry.selected = false;
        let id = self.ledger.insert(entry)?;
        tracing::debug!(%id, balance = %self.ledger.balance(), "entry added");
        Ok(Persisted {
            value: id,
            status: self.persist(),
        })
    }

    /// Flips the selection of `id`, returning the new flag.
    pub fn toggle_selection(&mut self, id: Uuid) -> Result<Persisted<bool>> {
        let selected = self.ledger.toggle_selection(id)?;
        Ok(Persisted {
            value: selected,
            status: self.persist(),
        })
    }

    pub fn select_all(&mut self, flag: bool) -> SaveStatus {
        self.ledger.select_all(flag);
        self.persist()
    }

    /// Swaps the whole collection. Entries are not re-validated, but a
    /// collection whose totals overflow is refused with the ledger unchanged.
    pub fn replace_all(&mut self, entries: Vec<Entry>) -> Result<SaveStatus> {
        let count = entries.len();
        self.ledger.replace_all(entries)?;
        tracing::info!(entries = count, "ledger replaced");
        Ok(self.persist())
    }

    pub fn selected_entries(&self) -> Vec<&Entry> {
        self.ledger.selected_entries()
    }

    /// Appends one compensating entry dated today per selected entry.
    pub fn reverse_selected(&mut self) -> Result<Persisted<Vec<Uuid>>> {
        let today = self.clock.today();
        let created = self.ledger.reverse_selected(today)?;
        tracing::info!(count = created.len(), %today, "entries reversed");
        Ok(Persisted {
            value: created,
            status: self.persist(),
        })
    }

    /// Commits a staged import, discarding the current ledger.
    pub fn commit_import(&mut self, staged: StagedImport) -> Result<Persisted<usize>> {
        let count = staged.count();
        Ok(Persisted {
            value: count,
            status: self.replace_all(staged.entries)?,
        })
    }

    /// Serializes the full ledger as a transferable export document.
    pub fn export(&self, source_label: &str) -> Result<ExportPayload> {
        let now = self.clock.now();
        let document =
            InterchangeService::export_document(self.ledger.entries(), source_label, now);
        let payload =
            InterchangeService::to_payload(&document, now.with_timezone(&Local).naive_local())?;
        tracing::info!(
            entries = document.entries.len(),
            file = %payload.file_name,
            "ledger exported"
        );
        Ok(payload)
    }

    pub fn describe_provider(&self) -> String {
        self.provider.describe()
    }

    fn persist(&self) -> SaveStatus {
        match self.provider.save(self.ledger.entries()) {
            Ok(()) => {
                tracing::debug!(entries = self.ledger.len(), "ledger saved");
                SaveStatus::Saved
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    provider = %self.provider.describe(),
                    "save failed; in-memory ledger kept"
                );
                SaveStatus::Failed(err)
            }
        }
    }
}

fn load_ledger(provider: &dyn PersistenceProvider) -> Result<Ledger> {
    let entries = provider.load()?;
    let ledger =
        Ledger::from_entries(entries).map_err(|err| StorageError::Corrupt(err.to_string()))?;
    tracing::info!(
        entries = ledger.len(),
        provider = %provider.describe(),
        "ledger loaded"
    );
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    fn store() -> LedgerStore {
        LedgerStore::empty(
            Box::new(MemoryStore::new()),
            Box::new(FixedClock::on(today())),
        )
    }

    #[test]
    fn add_entry_clears_transient_selection() {
        let mut store = store();
        let mut entry = Entry::new(
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            crate::ledger::EntryKind::Credit,
            "Gift",
            dec!(20),
        )
        .unwrap();
        entry.selected = true;
        let added = store.add_entry(entry).unwrap();
        assert!(added.status.is_saved());
        assert_eq!(store.ledger().selected_count(), 0);
    }

    #[test]
    fn failed_save_converts_into_persistence_error() {
        let status = SaveStatus::Failed(StorageError::Corrupt("broken".into()));
        let err = status.into_result().unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
    }

    #[test]
    fn reversal_uses_the_store_clock() {
        let mut store = store();
        let added = store
            .add(EntryDraft::new("2024-09-10", "saida", "Rent", "900"))
            .unwrap();
        store.toggle_selection(added.value).unwrap().status.into_result().unwrap();

        let reversal = store.reverse_selected().unwrap();
        let created = store.ledger().entry(reversal.value[0]).unwrap();
        assert_eq!(created.date, today());
        assert_eq!(store.balance(), Decimal::ZERO);
    }

    struct Unreadable {
        movable: bool,
    }

    impl PersistenceProvider for Unreadable {
        fn load(&self) -> crate::errors::StorageResult<Vec<Entry>> {
            Err(StorageError::Corrupt("garbage".into()))
        }

        fn save(&self, _entries: &[Entry]) -> crate::errors::StorageResult<()> {
            Err(StorageError::Corrupt("must not be overwritten".into()))
        }

        fn describe(&self) -> String {
            "unreadable".into()
        }

        fn quarantine(&self) -> crate::errors::StorageResult<Option<String>> {
            if self.movable {
                Ok(Some("elsewhere".into()))
            } else {
                Err(StorageError::Corrupt("read-only".into()))
            }
        }
    }

    #[test]
    fn unreadable_store_recovers_with_an_empty_ledger() {
        let (store, recovery) = LedgerStore::open_or_recover(
            Box::new(Unreadable { movable: true }),
            Box::new(FixedClock::on(today())),
        );
        let recovery = recovery.expect("recovery reported");
        assert!(store.ledger().is_empty());
        assert_eq!(recovery.moved_to.as_deref(), Some("elsewhere"));
        assert!(!recovery.volatile);
        assert!(matches!(recovery.error, LedgerError::Persistence(_)));
        assert!(recovery.message().contains("moved to elsewhere"));
    }

    #[test]
    fn recovery_falls_back_to_memory_when_data_cannot_be_moved() {
        let (mut store, recovery) = LedgerStore::open_or_recover(
            Box::new(Unreadable { movable: false }),
            Box::new(FixedClock::on(today())),
        );
        assert!(recovery.expect("recovery reported").volatile);
        assert_eq!(store.describe_provider(), "memory store");
        let added = store
            .add(EntryDraft::new("2024-09-10", "entrada", "Cash", "5"))
            .unwrap();
        assert!(added.status.is_saved());
    }
}
