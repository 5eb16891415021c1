//! Compensating ("extorno") entries for selected ledger entries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::ledger::Entry;

/// Prefix prepended to the description of every compensating entry.
pub const REVERSAL_PREFIX: &str = "EXTORNO - ";

pub struct ReversalService;

impl ReversalService {
    /// Builds one compensating entry per selected entry and clears the selection
    /// on the originals. Originals are otherwise left untouched.
    ///
    /// Returns [`LedgerError::NoSelection`] when nothing is selected.
    pub fn reverse(entries: &mut [Entry], today: NaiveDate) -> Result<Vec<Entry>> {
        let mut reversals = Vec::new();
        for original in entries.iter_mut().filter(|entry| entry.selected) {
            reversals.push(Self::compensate(original, today));
            original.selected = false;
        }
        if reversals.is_empty() {
            return Err(LedgerError::NoSelection);
        }
        Ok(reversals)
    }

    /// Opposite kind, same amount, dated `today`.
    pub fn compensate(original: &Entry, today: NaiveDate) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            date: today,
            kind: original.kind.opposite(),
            description: format!("{REVERSAL_PREFIX}{}", original.description),
            amount: original.amount,
            running_balance: Decimal::ZERO,
            selected: false,
        }
    }
}
