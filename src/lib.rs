#![doc(test(attr(deny(warnings))))]

//! Extrato Core keeps a personal statement of credit and debit entries with a
//! running balance, reversal of selected entries, JSON import/export and
//! interchangeable persistence providers.

pub mod cli;
pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod time;
pub mod utils;

pub use crate::core::{
    Command, CommandOutcome, Effect, LedgerSession, LedgerSnapshot, LedgerStore, Notification,
    SaveStatus, SessionSettings, Severity,
};
pub use errors::{LedgerError, Result, StorageError};
pub use ledger::{Entry, EntryDraft, EntryKind, Ledger};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Extrato Core tracing initialized.");
    });
}
