//! Ledger domain model: entries and the ordered collection that owns them.

pub mod entry;
#[allow(clippy::module_inception)]
pub mod ledger;

pub use entry::{parse_date, Entry, EntryDraft, EntryKind, DATE_FORMAT};
pub use ledger::Ledger;
