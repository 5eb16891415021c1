use std::{
    borrow::Cow,
    cell::Cell,
    fmt,
    io::{self, BufRead},
    rc::Rc,
};

use colored::Colorize;
use rustyline::{
    completion::{Completer, FilenameCompleter, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::info as output_info;
use crate::ledger::EntryKind;

/// Environment variable switching the shell to line-by-line script mode.
pub const SCRIPT_ENV: &str = "EXTRATO_CLI_SCRIPT";

const ENTRY_KINDS: [EntryKind; 2] = [EntryKind::Credit, EntryKind::Debit];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    context.flush_notifications();

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let entry_count = Rc::new(Cell::new(0));
    let mut editor = Editor::<ShellHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(ShellHelper::new(
        context.command_usages(),
        Rc::clone(&entry_count),
    )));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    while context.running {
        entry_count.set(context.session.store().ledger().len());
        let prompt = context.prompt();

        match editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                editor.add_history_entry(trimmed).ok();

                match handle_line(context, trimmed) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        let line = line?;
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    Ok(())
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            context.print_warning(&err.message);
            return Ok(LoopControl::Continue);
        }
    };

    // `#` starts a comment line in scripts.
    if tokens.is_empty() || tokens[0].starts_with('#') {
        return Ok(LoopControl::Continue);
    }

    let raw = &tokens[0];
    let command = raw.to_lowercase();
    let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();

    match context.dispatch(&command, raw, &args) {
        Ok(LoopControl::Exit) => {
            context.running = false;
            Ok(LoopControl::Exit)
        }
        other => other,
    }
}

/// Completion and usage hints for the interactive editor.
///
/// Knows the argument shape of the ledger commands: list positions after
/// `toggle`, movement kinds as the second `add` argument, command names after
/// `help` and paths after `import`/`export`.
struct ShellHelper {
    commands: Vec<(&'static str, &'static str)>,
    entry_count: Rc<Cell<usize>>,
    files: FilenameCompleter,
}

impl ShellHelper {
    fn new(commands: Vec<(&'static str, &'static str)>, entry_count: Rc<Cell<usize>>) -> Self {
        Self {
            commands,
            entry_count,
            files: FilenameCompleter::new(),
        }
    }

    fn names(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Candidates for argument `index` (0-based) of `command`, or `None` when
    /// the argument is a file path.
    fn argument_candidates(&self, command: &str, index: usize) -> Option<Vec<String>> {
        let candidates = match (command, index) {
            ("toggle", _) => (1..=self.entry_count.get())
                .map(|position| position.to_string())
                .collect(),
            ("add", 1) => ENTRY_KINDS
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            ("help", 0) => self.names(),
            ("import" | "export", 0) => return None,
            _ => Vec::new(),
        };
        Some(candidates)
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let needle = prefix[start..].to_ascii_lowercase();
        let typed: Vec<&str> = prefix[..start].split_whitespace().collect();

        let candidates = match typed.split_first() {
            None => self.names(),
            Some((command, args)) => {
                match self.argument_candidates(&command.to_ascii_lowercase(), args.len()) {
                    Some(candidates) => candidates,
                    None => return self.files.complete(line, pos, ctx),
                }
            }
        };

        let pairs = candidates
            .into_iter()
            .filter(|candidate| candidate.starts_with(&needle))
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    /// Shows the expected arguments right after a command name and a space.
    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos < line.len() || !line.ends_with(' ') {
            return None;
        }
        let mut words = line.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();
        if words.next().is_some() {
            return None;
        }
        let (command, usage) = self.commands.iter().find(|(command, _)| *command == name)?;
        let arguments = usage.strip_prefix(*command)?.trim();
        (!arguments.is_empty()).then(|| arguments.to_string())
    }
}

impl Highlighter for ShellHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for ShellHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
