use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Display preferences for amounts and dates. Defaults follow pt-BR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleConfig {
    pub symbol: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_pattern: String,
    pub negative_style: NegativeStyle,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            symbol: "R$".into(),
            decimal_separator: ',',
            grouping_separator: '.',
            date_pattern: "%d/%m/%Y".into(),
            negative_style: NegativeStyle::Sign,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NegativeStyle {
    Sign,
    Parentheses,
}

/// Formats `amount` with the default locale, e.g. `R$ 1.234,50` or `R$ -30,00`.
pub fn format_amount(amount: Decimal) -> String {
    format_amount_with(&LocaleConfig::default(), amount)
}

pub fn format_amount_with(locale: &LocaleConfig, amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let body = format_number(locale, rounded.abs());
    if rounded.is_sign_negative() && !rounded.is_zero() {
        match locale.negative_style {
            NegativeStyle::Sign => format!("{} -{}", locale.symbol, body),
            NegativeStyle::Parentheses => format!("{} ({})", locale.symbol, body),
        }
    } else {
        format!("{} {}", locale.symbol, body)
    }
}

/// Formats a ledger date for display, `dd/mm/yyyy` by default.
pub fn format_date(date: NaiveDate) -> String {
    format_date_with(&LocaleConfig::default(), date)
}

pub fn format_date_with(locale: &LocaleConfig, date: NaiveDate) -> String {
    date.format(&locale.date_pattern).to_string()
}

fn format_number(locale: &LocaleConfig, value: Decimal) -> String {
    let text = format!("{:.2}", value);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::new();
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(locale.grouping_separator);
        }
        grouped.push(ch);
    }
    format!("{grouped}{}{frac_part}", locale.decimal_separator)
}
