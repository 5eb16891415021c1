use crate::cli::core::{CliMode, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{render_statement, render_totals, section};
use crate::cli::registry::CommandEntry;
use crate::core::Command;
use crate::ledger::{EntryDraft, DATE_FORMAT};
use crate::time::Clock;

const ADD_USAGE: &str = "add <YYYY-MM-DD> <entrada|saida> <amount> <description...>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("add", "Record a credit or debit entry", ADD_USAGE, cmd_add),
        CommandEntry::new("list", "Show the statement with running balances", "list", cmd_list),
        CommandEntry::new("balance", "Show credit, debit and net totals", "balance", cmd_balance),
        CommandEntry::new(
            "toggle",
            "Select or deselect entries by list position or id",
            "toggle <position|id>...",
            cmd_toggle,
        ),
        CommandEntry::new("select-all", "Select every entry", "select-all", cmd_select_all),
        CommandEntry::new("select-none", "Clear the selection", "select-none", cmd_select_none),
        CommandEntry::new(
            "reverse",
            "Append a compensating entry for each selected entry",
            "reverse",
            cmd_reverse,
        ),
    ]
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let draft = match args {
        [date, kind, amount, description @ ..] if !description.is_empty() => {
            EntryDraft::new(*date, *kind, description.join(" "), *amount)
        }
        [] if context.mode == CliMode::Interactive => prompt_draft(context)?,
        _ => {
            return Err(CommandError::InvalidArguments(format!(
                "usage: {ADD_USAGE}"
            )))
        }
    };
    context.run_session(Command::AddEntry(draft));
    Ok(())
}

fn prompt_draft(context: &ShellContext) -> Result<EntryDraft, CommandError> {
    let today = context.session.store().clock().today();
    let date = io::prompt_text(
        &context.theme,
        &format!("Date (YYYY-MM-DD, today is {})", today.format(DATE_FORMAT)),
    )?;
    let kind = io::prompt_text(&context.theme, "Kind (entrada/saida)")?;
    let description = io::prompt_text(&context.theme, "Description")?;
    let amount = io::prompt_text(&context.theme, "Amount")?;
    Ok(EntryDraft::new(date, kind, description, amount))
}

fn cmd_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    section("Statement");
    println!("{}", render_statement(&context.session.snapshot()));
    Ok(())
}

fn cmd_balance(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    section("Balance");
    println!("{}", render_totals(&context.session.store().totals()));
    Ok(())
}

fn cmd_toggle(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::InvalidArguments(
            "usage: toggle <position|id>...".into(),
        ));
    }
    let ids = args
        .iter()
        .map(|token| context.resolve_entry(token))
        .collect::<Result<Vec<_>, _>>()?;
    for id in ids {
        context.run_session(Command::ToggleSelection(id));
    }
    Ok(())
}

fn cmd_select_all(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.run_session(Command::SelectAll(true));
    Ok(())
}

fn cmd_select_none(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.run_session(Command::SelectAll(false));
    Ok(())
}

fn cmd_reverse(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let selected = context.session.snapshot().selected_count;
    if selected > 0 && !context.confirm(&format!("Reverse {selected} selected entries?"))? {
        io::print_info("Reversal cancelled.");
        return Ok(());
    }
    context.run_session(Command::ConfirmReversal);
    Ok(())
}
