//! Typed command handlers over a [`LedgerStore`], plus the notification channel
//! presentation layers read transient feedback from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger_store::{LedgerSnapshot, LedgerStore, Recovery, SaveStatus};
use crate::core::services::{ExportPayload, InterchangeService, StagedImport};
use crate::errors::{LedgerError, Result, StorageError};
use crate::ledger::EntryDraft;

const DEFAULT_SOURCE_LABEL: &str = "extrato";
const DEFAULT_NOTIFICATION_MS: u64 = 3_000;
const DEFAULT_ERROR_NOTIFICATION_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

/// Transient user feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
}

/// User intents accepted by [`LedgerSession::dispatch`].
#[derive(Debug, Clone)]
pub enum Command {
    AddEntry(EntryDraft),
    ToggleSelection(Uuid),
    SelectAll(bool),
    ConfirmReversal,
    StageImport(Vec<u8>),
    CommitImport,
    CancelImport,
    Export,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::AddEntry(_) => "add_entry",
            Command::ToggleSelection(_) => "toggle_selection",
            Command::SelectAll(_) => "select_all",
            Command::ConfirmReversal => "confirm_reversal",
            Command::StageImport(_) => "stage_import",
            Command::CommitImport => "commit_import",
            Command::CancelImport => "cancel_import",
            Command::Export => "export",
        }
    }
}

/// What a successful command did, beyond the refreshed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Added(Uuid),
    Toggled { id: Uuid, selected: bool },
    SelectionSet(bool),
    Reversed(Vec<Uuid>),
    ImportStaged { count: usize, warnings: Vec<String> },
    Imported(usize),
    ImportCancelled,
    Exported(ExportPayload),
}

#[derive(Debug)]
pub struct CommandOutcome {
    pub snapshot: LedgerSnapshot,
    pub effect: Effect,
    /// Set when the in-memory change succeeded but could not be persisted.
    pub save_error: Option<StorageError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub source_label: String,
    pub notification_duration_ms: u64,
    pub error_duration_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            notification_duration_ms: DEFAULT_NOTIFICATION_MS,
            error_duration_ms: DEFAULT_ERROR_NOTIFICATION_MS,
        }
    }
}

struct Applied {
    effect: Effect,
    status: Option<SaveStatus>,
    message: String,
    severity: Severity,
}

/// One ledger session: a store, a pending import and queued notifications.
pub struct LedgerSession {
    store: LedgerStore,
    settings: SessionSettings,
    staged: Option<StagedImport>,
    notifications: Vec<Notification>,
}

impl LedgerSession {
    pub fn new(store: LedgerStore, settings: SessionSettings) -> Self {
        Self {
            store,
            settings,
            staged: None,
            notifications: Vec::new(),
        }
    }

    /// Queues the warning for a store that started empty after a failed load.
    pub fn with_recovery(mut self, recovery: Option<&Recovery>) -> Self {
        if let Some(recovery) = recovery {
            self.notify(recovery.error.severity(), recovery.message());
        }
        self
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.store.snapshot()
    }

    pub fn staged_import(&self) -> Option<&StagedImport> {
        self.staged.as_ref()
    }

    /// Drains queued notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Applies `command` and queues exactly one notification describing the result.
    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutcome> {
        let name = command.name();
        match self.apply(command) {
            Ok(applied) => {
                let save_error = match applied.status {
                    Some(SaveStatus::Failed(err)) => {
                        self.notify(
                            Severity::Warning,
                            format!("{} but could not be saved: {err}", applied.message),
                        );
                        Some(err)
                    }
                    _ => {
                        self.notify(applied.severity, applied.message);
                        None
                    }
                };
                Ok(CommandOutcome {
                    snapshot: self.store.snapshot(),
                    effect: applied.effect,
                    save_error,
                })
            }
            Err(err) => {
                tracing::debug!(command = name, error = %err, "command rejected");
                self.notify(err.severity(), user_message(&err));
                Err(err)
            }
        }
    }

    fn apply(&mut self, command: Command) -> Result<Applied> {
        let applied = match command {
            Command::AddEntry(draft) => {
                let added = self.store.add(draft)?;
                Applied {
                    effect: Effect::Added(added.value),
                    status: Some(added.status),
                    message: "Entry added".into(),
                    severity: Severity::Success,
                }
            }
            Command::ToggleSelection(id) => {
                let toggled = self.store.toggle_selection(id)?;
                let message = if toggled.value {
                    "Entry selected"
                } else {
                    "Entry deselected"
                };
                Applied {
                    effect: Effect::Toggled {
                        id,
                        selected: toggled.value,
                    },
                    status: Some(toggled.status),
                    message: message.into(),
                    severity: Severity::Info,
                }
            }
            Command::SelectAll(flag) => {
                let status = self.store.select_all(flag);
                let message = if flag {
                    "All entries selected"
                } else {
                    "Selection cleared"
                };
                Applied {
                    effect: Effect::SelectionSet(flag),
                    status: Some(status),
                    message: message.into(),
                    severity: Severity::Info,
                }
            }
            Command::ConfirmReversal => {
                let reversed = self.store.reverse_selected()?;
                let count = reversed.value.len();
                Applied {
                    effect: Effect::Reversed(reversed.value),
                    status: Some(reversed.status),
                    message: format!("{count} {} reversed", plural(count)),
                    severity: Severity::Success,
                }
            }
            Command::StageImport(raw) => {
                let staged = InterchangeService::parse_import(&raw)?;
                let count = staged.count();
                let warnings = staged.warnings.clone();
                let mut message = format!(
                    "{count} {} ready to import; committing replaces the current ledger",
                    plural(count)
                );
                if !warnings.is_empty() {
                    message.push_str(&format!(" ({} warnings)", warnings.len()));
                }
                self.staged = Some(staged);
                Applied {
                    effect: Effect::ImportStaged { count, warnings },
                    status: None,
                    message,
                    severity: Severity::Info,
                }
            }
            Command::CommitImport => {
                let staged = self
                    .staged
                    .take()
                    .ok_or_else(|| LedgerError::validation("no import is staged"))?;
                let imported = self.store.commit_import(staged)?;
                Applied {
                    effect: Effect::Imported(imported.value),
                    status: Some(imported.status),
                    message: format!("{} {} imported", imported.value, plural(imported.value)),
                    severity: Severity::Success,
                }
            }
            Command::CancelImport => {
                self.staged = None;
                Applied {
                    effect: Effect::ImportCancelled,
                    status: None,
                    message: "Import cancelled".into(),
                    severity: Severity::Info,
                }
            }
            Command::Export => {
                let payload = self.store.export(&self.settings.source_label)?;
                let message = format!("Ledger exported to {}", payload.file_name);
                Applied {
                    effect: Effect::Exported(payload),
                    status: None,
                    message,
                    severity: Severity::Success,
                }
            }
        };
        Ok(applied)
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let duration_ms = match severity {
            Severity::Error | Severity::Warning => self.settings.error_duration_ms,
            Severity::Success | Severity::Info => self.settings.notification_duration_ms,
        };
        self.notifications.push(Notification {
            message: message.into(),
            severity,
            duration_ms,
        });
    }
}

fn user_message(err: &LedgerError) -> String {
    match err {
        LedgerError::NoSelection => "Select at least one entry to reverse".to_string(),
        other => other.to_string(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "entry"
    } else {
        "entries"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::time::FixedClock;
    use chrono::NaiveDate;

    fn session() -> LedgerSession {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        let store = LedgerStore::empty(Box::new(MemoryStore::new()), Box::new(clock));
        LedgerSession::new(store, SessionSettings::default())
    }

    #[test]
    fn every_dispatch_queues_one_notification() {
        let mut session = session();
        session
            .dispatch(Command::AddEntry(EntryDraft::new(
                "2024-11-02",
                "entrada",
                "Salary",
                "100",
            )))
            .unwrap();
        let _ = session.dispatch(Command::ConfirmReversal);

        let notes = session.take_notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].severity, Severity::Success);
        assert_eq!(notes[0].duration_ms, DEFAULT_NOTIFICATION_MS);
        assert_eq!(notes[1].severity, Severity::Warning);
        assert_eq!(notes[1].message, "Select at least one entry to reverse");
        assert_eq!(notes[1].duration_ms, DEFAULT_ERROR_NOTIFICATION_MS);
        assert!(session.take_notifications().is_empty());
    }

    #[test]
    fn commit_without_staged_import_is_rejected() {
        let mut session = session();
        let err = session.dispatch(Command::CommitImport).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn cancel_discards_staged_import() {
        let mut session = session();
        let payload = br#"{"entries": []}"#.to_vec();
        session.dispatch(Command::StageImport(payload)).unwrap();
        assert!(session.staged_import().is_some());
        session.dispatch(Command::CancelImport).unwrap();
        assert!(session.staged_import().is_none());
    }

    #[test]
    fn save_failures_are_reported_as_warnings_without_losing_state() {
        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        let provider = MemoryStore::new().with_quota(8);
        let store = LedgerStore::empty(Box::new(provider), Box::new(clock));
        let mut session = LedgerSession::new(store, SessionSettings::default());

        let outcome = session
            .dispatch(Command::AddEntry(EntryDraft::new(
                "2024-11-02",
                "saida",
                "Coffee",
                "4,50",
            )))
            .unwrap();
        assert!(matches!(
            outcome.save_error,
            Some(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(outcome.snapshot.entries.len(), 1);

        let notes = session.take_notifications();
        assert_eq!(notes[0].severity, Severity::Warning);
        assert!(notes[0].message.starts_with("Entry added but could not be saved"));
    }

    #[test]
    fn recovery_is_announced_as_a_warning() {
        let recovery = Recovery {
            error: LedgerError::Persistence(StorageError::Corrupt("bad json".into())),
            moved_to: Some("ledger.json.corrupt".into()),
            volatile: false,
        };
        let mut session = session().with_recovery(Some(&recovery));
        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Warning);
        assert!(notes[0].message.contains("bad json"));
        assert!(notes[0].message.ends_with("moved to ledger.json.corrupt"));
    }
}
