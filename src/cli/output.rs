use colored::Colorize;
use std::fmt;

use crate::core::{services::BalanceTotals, LedgerSnapshot, Severity};
use crate::currency::{format_amount, format_date};
use crate::ledger::EntryKind;

const DESCRIPTION_WIDTH: usize = 24;
const AMOUNT_WIDTH: usize = 14;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

impl From<Severity> for MessageKind {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Success => MessageKind::Success,
            Severity::Error => MessageKind::Error,
            Severity::Warning => MessageKind::Warning,
            Severity::Info => MessageKind::Info,
        }
    }
}

fn build_label(kind: MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Info => ("INFO", "[i]"),
        MessageKind::Success => ("SUCCESS", "[✓]"),
        MessageKind::Warning => ("WARNING", "[!]"),
        MessageKind::Error => ("ERROR", "[x]"),
        MessageKind::Hint => ("HINT", ">"),
        MessageKind::Section => ("", ""),
    }
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        _ => {
            let (label, icon) = build_label(kind);
            format!("{label}: {icon} {text}")
        }
    };

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Hint => formatted.bright_cyan().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Renders the statement table shown by `list`, without colors.
pub fn render_statement(snapshot: &LedgerSnapshot) -> String {
    if snapshot.entries.is_empty() {
        return "No entries yet.".to_string();
    }

    let mut lines = Vec::with_capacity(snapshot.entries.len() + 4);
    lines.push(format!(
        "{:<3} {:>3}  {:<10}  {:<6}  {:<desc$}  {:>amt$}  {:>amt$}",
        "Sel",
        "#",
        "Date",
        "Kind",
        "Description",
        "Amount",
        "Balance",
        desc = DESCRIPTION_WIDTH,
        amt = AMOUNT_WIDTH,
    ));
    let width = lines[0].chars().count();
    lines.push("-".repeat(width));

    for (idx, entry) in snapshot.entries.iter().enumerate() {
        let mark = if entry.selected { "[x]" } else { "[ ]" };
        let kind = match entry.kind {
            EntryKind::Credit => "credit",
            EntryKind::Debit => "debit",
        };
        lines.push(format!(
            "{:<3} {:>3}  {:<10}  {:<6}  {:<desc$}  {:>amt$}  {:>amt$}",
            mark,
            idx + 1,
            format_date(entry.date),
            kind,
            truncate(&entry.description, DESCRIPTION_WIDTH),
            format_amount(entry.signed_amount()),
            format_amount(entry.running_balance),
            desc = DESCRIPTION_WIDTH,
            amt = AMOUNT_WIDTH,
        ));
    }

    lines.push("-".repeat(width));
    lines.push(format!(
        "Balance: {} ({} selected)",
        format_amount(snapshot.balance),
        snapshot.selected_count
    ));
    lines.join("\n")
}

pub fn render_totals(totals: &BalanceTotals) -> String {
    format!(
        "Credits: {}\nDebits:  {}\nBalance: {}",
        format_amount(totals.credits),
        format_amount(totals.debits),
        format_amount(totals.balance)
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}
