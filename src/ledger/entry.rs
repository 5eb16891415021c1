use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

/// Wire and storage format for entry dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryKind {
    #[serde(rename = "entrada")]
    Credit,
    #[serde(rename = "saida", alias = "saída")]
    Debit,
}

impl EntryKind {
    pub fn opposite(self) -> Self {
        match self {
            EntryKind::Credit => EntryKind::Debit,
            EntryKind::Debit => EntryKind::Credit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Credit => "entrada",
            EntryKind::Debit => "saida",
        }
    }

    /// Applies the movement direction to an amount.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            EntryKind::Credit => amount,
            EntryKind::Debit => -amount,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "entrada" | "credit" | "in" | "+" => Ok(EntryKind::Credit),
            "saida" | "saída" | "debit" | "out" | "-" => Ok(EntryKind::Debit),
            other => Err(LedgerError::validation(format!(
                "unknown movement kind `{other}` (use entrada or saida)"
            ))),
        }
    }
}

/// One dated cash movement.
///
/// `running_balance` is derived from ledger order and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: Uuid,
    #[serde(alias = "data")]
    pub date: NaiveDate,
    #[serde(alias = "movimento")]
    pub kind: EntryKind,
    #[serde(alias = "historico")]
    pub description: String,
    #[serde(alias = "valor", with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    #[serde(skip)]
    pub running_balance: Decimal,
    #[serde(default, alias = "selecionado")]
    pub selected: bool,
}

impl Entry {
    /// Builds a validated, unselected entry with a fresh identifier.
    pub fn new(
        date: NaiveDate,
        kind: EntryKind,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Result<Self> {
        let entry = Self {
            id: Uuid::new_v4(),
            date,
            kind,
            description: description.into().trim().to_string(),
            amount,
            running_balance: Decimal::ZERO,
            selected: false,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Checks the invariants every user-created entry must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be greater than zero"));
        }
        if self.description.trim().is_empty() {
            return Err(LedgerError::validation("description is required"));
        }
        Ok(())
    }

    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

/// Raw form input for a new entry, validated by [`EntryDraft::into_entry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: String,
    pub kind: String,
    pub description: String,
    pub amount: String,
}

impl EntryDraft {
    pub fn new(
        date: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            kind: kind.into(),
            description: description.into(),
            amount: amount.into(),
        }
    }

    /// Validates every field and produces a typed entry.
    ///
    /// Presence of every field is checked first, then the amount, then the
    /// date and kind formats.
    pub fn into_entry(self) -> Result<Entry> {
        let fields = [&self.date, &self.kind, &self.description, &self.amount];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(LedgerError::validation("all fields are required"));
        }

        let amount = parse_amount(&self.amount)?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be greater than zero"));
        }

        let date = parse_date(&self.date)?;
        let kind = self.kind.parse::<EntryKind>()?;
        Entry::new(date, kind, self.description, amount)
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| {
        LedgerError::validation(format!("invalid date `{}` (use YYYY-MM-DD)", input.trim()))
    })
}

/// Parses a decimal amount written either way: `1234.56`, `1,234.56`,
/// `1234,56` or `1.234,56`. The rightmost separator is the decimal one.
fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        (None, _) => trimmed.to_string(),
    };
    Decimal::from_str(&normalized)
        .map_err(|_| LedgerError::validation(format!("invalid amount `{trimmed}`")))
}
