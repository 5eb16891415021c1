use std::{fs, path::PathBuf};

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;
use crate::core::{Command, CommandOutcome, Effect};
use crate::utils::{ensure_dir, exports_dir_in};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "export",
            "Write the ledger to a JSON export file",
            "export [file|directory]",
            cmd_export,
        ),
        CommandEntry::new(
            "import",
            "Replace the ledger with the entries of a JSON export",
            "import <file>",
            cmd_import,
        ),
    ]
}

fn cmd_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(CommandOutcome {
        effect: Effect::Exported(payload),
        ..
    }) = context.run_session(Command::Export)
    else {
        return Ok(());
    };

    let destination = match args.first().map(PathBuf::from) {
        Some(path) if path.is_dir() => path.join(&payload.file_name),
        Some(path) => path,
        None => {
            let dir = exports_dir_in(&context.data_dir);
            ensure_dir(&dir)?;
            dir.join(&payload.file_name)
        }
    };
    fs::write(&destination, &payload.bytes)?;
    io::print_success(format!("Wrote {}", destination.display()));
    Ok(())
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = args
        .first()
        .ok_or_else(|| CommandError::InvalidArguments("usage: import <file>".into()))?;
    let raw = fs::read(path)?;

    let Some(CommandOutcome {
        effect: Effect::ImportStaged { count, warnings },
        ..
    }) = context.run_session(Command::StageImport(raw))
    else {
        return Ok(());
    };

    for warning in &warnings {
        io::print_warning(warning);
    }
    let current = context.session.store().ledger().len();
    let prompt = format!("Replace {current} current entries with {count} imported entries?");
    let command = if context.confirm(&prompt)? {
        Command::CommitImport
    } else {
        Command::CancelImport
    };
    context.run_session(command);
    Ok(())
}
