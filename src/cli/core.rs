//! Core CLI dispatch and shell context helpers.

use std::io;

use dialoguer::theme::ColorfulTheme;
use uuid::Uuid;

use crate::{
    config::{Config, ConfigManager},
    core::{Command, CommandOutcome, LedgerSession, LedgerStore, Recovery},
    errors::{LedgerError, StorageError},
    storage::{open_backend, MemoryStore},
    time::SystemClock,
};

use super::commands;
use super::io as cli_io;
use super::registry::{CommandEntry, CommandRegistry};
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Failures that abort the shell.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Failures of a single command; reported and the shell keeps running.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::new()?;
        let config = config_manager.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, path = %config_manager.path().display(), "config unreadable");
            cli_io::print_warning(format!(
                "Config file could not be read ({err}); using defaults."
            ));
            Config::default()
        });
        let data_dir = config_manager.base_dir().to_path_buf();
        let (store, recovery) = match open_backend(config.backend, &data_dir) {
            Ok(provider) => LedgerStore::open_or_recover(provider, Box::new(SystemClock)),
            Err(err) => {
                tracing::warn!(error = %err, backend = %config.backend, "storage backend unavailable");
                let store =
                    LedgerStore::empty(Box::new(MemoryStore::new()), Box::new(SystemClock));
                let recovery = Recovery {
                    error: LedgerError::Persistence(err),
                    moved_to: None,
                    volatile: true,
                };
                (store, Some(recovery))
            }
        };
        let session =
            LedgerSession::new(store, config.session_settings()).with_recovery(recovery.as_ref());

        Ok(ShellContext {
            mode,
            registry,
            session,
            theme: ColorfulTheme::default(),
            config_manager,
            config,
            data_dir,
            running: true,
        })
    }

    /// `(name, usage)` pairs in registration order.
    pub(crate) fn command_usages(&self) -> Vec<(&'static str, &'static str)> {
        self.registry
            .list()
            .into_iter()
            .map(|entry| (entry.name, entry.usage))
            .collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn prompt(&self) -> String {
        let snapshot = self.session.snapshot();
        format!(
            "extrato [{} entries, {} selected] > ",
            snapshot.entries.len(),
            snapshot.selected_count
        )
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    /// Sends `command` to the session and prints the notification it produced.
    ///
    /// Returns `None` when the session rejected the command; the user has
    /// already been told why.
    pub(crate) fn run_session(&mut self, command: Command) -> Option<CommandOutcome> {
        let outcome = self.session.dispatch(command).ok();
        self.flush_notifications();
        outcome
    }

    pub(crate) fn flush_notifications(&mut self) {
        for notification in self.session.take_notifications() {
            cli_io::print_notification(&notification);
        }
    }

    /// Resolves a 1-based list position or an entry id.
    pub(crate) fn resolve_entry(&self, token: &str) -> Result<Uuid, CommandError> {
        let ledger = self.session.store().ledger();
        if let Ok(position) = token.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|idx| ledger.entries().get(idx))
                .map(|entry| entry.id)
                .ok_or_else(|| {
                    CommandError::InvalidArguments(format!(
                        "no entry at position {position} (ledger has {})",
                        ledger.len()
                    ))
                });
        }
        Uuid::parse_str(token).map_err(|_| {
            CommandError::InvalidArguments(format!(
                "`{token}` is neither a list position nor an entry id"
            ))
        })
    }

    /// Asks for confirmation; script runs accept automatically.
    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, prompt, true)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = self.registry.suggest(input) {
            cli_io::print_info(format!("Suggestion: `{}`?", best));
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(cli_io::confirm_action(&self.theme, "Exit shell?", false).unwrap_or(true))
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                self.print_error(&message);
                cli_io::print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            other => {
                self.print_error(&other.to_string());
                Ok(())
            }
        }
    }

    pub(crate) fn print_error(&self, message: &str) {
        cli_io::print_error(message);
    }

    pub(crate) fn print_warning(&self, message: &str) {
        cli_io::print_warning(message);
    }
}
