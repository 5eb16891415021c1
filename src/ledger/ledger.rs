use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::entry::Entry;
use crate::{
    core::services::{BalanceOverflow, BalanceService, BalanceTotals, ReversalService},
    errors::{LedgerError, Result},
};

/// Ordered collection of entries with cached running balances.
///
/// Entries are kept in non-decreasing date order; entries sharing a date keep
/// their insertion order. Every mutation that changes the set of entries is
/// folded on a candidate collection first, so a change whose totals would leave
/// the `Decimal` range is rejected with the ledger untouched.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<Entry>,
    totals: BalanceTotals,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from entries in arbitrary order.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        let mut ledger = Self::new();
        ledger.commit(entries).map_err(|err| {
            LedgerError::validation(format!("entries cannot be balanced: {err}"))
        })?;
        Ok(ledger)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Overall balance after the last entry.
    pub fn balance(&self) -> Decimal {
        self.totals.balance
    }

    pub fn totals(&self) -> BalanceTotals {
        self.totals
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entry(id).is_some()
    }

    /// Inserts an entry, keeping date order and refreshing balances.
    pub fn insert(&mut self, entry: Entry) -> Result<Uuid> {
        if self.contains(entry.id) {
            return Err(LedgerError::validation(format!(
                "an entry with id {} already exists",
                entry.id
            )));
        }
        let id = entry.id;
        let mut candidate = self.entries.clone();
        candidate.push(entry);
        self.commit(candidate).map_err(|_| {
            LedgerError::validation("amount is too large: the ledger totals would overflow")
        })?;
        Ok(id)
    }

    /// Appends one compensating entry dated `today` per selected entry and
    /// clears the selection. Returns the new ids in ledger order of their
    /// originals.
    pub fn reverse_selected(&mut self, today: NaiveDate) -> Result<Vec<Uuid>> {
        let mut candidate = self.entries.clone();
        let reversals = ReversalService::reverse(&mut candidate, today)?;
        let created = reversals.iter().map(|entry| entry.id).collect();
        candidate.extend(reversals);
        self.commit(candidate).map_err(|_| {
            LedgerError::validation("reversal rejected: the ledger totals would overflow")
        })?;
        Ok(created)
    }

    /// Flips the selection flag of `id` and returns the new value.
    pub fn toggle_selection(&mut self, id: Uuid) -> Result<bool> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(LedgerError::NotFound(id))?;
        entry.selected = !entry.selected;
        Ok(entry.selected)
    }

    pub fn select_all(&mut self, flag: bool) {
        for entry in &mut self.entries {
            entry.selected = flag;
        }
    }

    /// Swaps the entire collection.
    pub fn replace_all(&mut self, entries: Vec<Entry>) -> Result<()> {
        self.commit(entries).map_err(|err| {
            LedgerError::malformed(format!("imported entries cannot be balanced: {err}"))
        })
    }

    pub fn selected_entries(&self) -> Vec<&Entry> {
        self.entries.iter().filter(|entry| entry.selected).collect()
    }

    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.selected).count()
    }

    fn commit(&mut self, mut candidate: Vec<Entry>) -> std::result::Result<(), BalanceOverflow> {
        candidate.sort_by_key(|entry| entry.date);
        let totals = BalanceService::recompute(&mut candidate)?;
        self.entries = candidate;
        self.totals = totals;
        Ok(())
    }
}
