use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::{Entry, EntryKind};

/// Credit, debit and net totals over a run of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BalanceTotals {
    pub credits: Decimal,
    pub debits: Decimal,
    pub balance: Decimal,
}

/// A running total, or the credit/debit sum, left the `Decimal` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("running totals overflow at entry #{position}")]
pub struct BalanceOverflow {
    /// 1-based position, in ledger order, of the entry that overflowed.
    pub position: usize,
}

pub struct BalanceService;

impl BalanceService {
    /// Rewrites every `running_balance` as a left fold over ledger order and
    /// returns the final totals.
    ///
    /// Entries must already be in ledger order; there is no incremental mode.
    /// On overflow the running balances are left partially rewritten, so
    /// callers fold over a copy they can discard.
    pub fn recompute(entries: &mut [Entry]) -> Result<BalanceTotals, BalanceOverflow> {
        let mut totals = BalanceTotals::default();
        for (index, entry) in entries.iter_mut().enumerate() {
            totals = Self::step(totals, entry, index + 1)?;
            entry.running_balance = totals.balance;
        }
        Ok(totals)
    }

    /// Folds `entries` in the order given without touching them.
    pub fn totals<'a, I>(entries: I) -> Result<BalanceTotals, BalanceOverflow>
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        entries
            .into_iter()
            .enumerate()
            .try_fold(BalanceTotals::default(), |totals, (index, entry)| {
                Self::step(totals, entry, index + 1)
            })
    }

    fn step(
        mut totals: BalanceTotals,
        entry: &Entry,
        position: usize,
    ) -> Result<BalanceTotals, BalanceOverflow> {
        let overflow = BalanceOverflow { position };
        match entry.kind {
            EntryKind::Credit => {
                totals.credits = totals.credits.checked_add(entry.amount).ok_or(overflow)?
            }
            EntryKind::Debit => {
                totals.debits = totals.debits.checked_add(entry.amount).ok_or(overflow)?
            }
        }
        totals.balance = totals
            .balance
            .checked_add(entry.signed_amount())
            .ok_or(overflow)?;
        Ok(totals)
    }
}
