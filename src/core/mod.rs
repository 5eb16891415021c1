pub mod ledger_store;
pub mod services;
pub mod session;

pub use ledger_store::{LedgerSnapshot, LedgerStore, Persisted, Recovery, SaveStatus};
pub use session::{
    Command, CommandOutcome, Effect, LedgerSession, Notification, SessionSettings, Severity,
};
