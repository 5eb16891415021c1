//! JSON import staging and export documents.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::BalanceService;
use crate::errors::{LedgerError, Result, StorageError};
use crate::ledger::{Entry, EntryKind};

/// Array fields recognised as the entry collection, in lookup order.
pub const ENTRY_ARRAY_FIELDS: [&str; 2] = ["entries", "lancamentos"];
const EXPORT_FILE_PREFIX: &str = "extrato";
const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Transferable export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub source_label: String,
    pub entries: Vec<Entry>,
}

/// Serialized export ready to be handed to a download or file writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Import candidates that passed structural checks but are not committed yet.
#[derive(Debug, Clone)]
pub struct StagedImport {
    pub entries: Vec<Entry>,
    pub warnings: Vec<String>,
    pub exported_at: Option<DateTime<Utc>>,
    pub source_label: Option<String>,
}

impl StagedImport {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Deserialize)]
struct ImportedEntry {
    #[serde(default)]
    id: Option<Value>,
    #[serde(alias = "data")]
    date: NaiveDate,
    #[serde(alias = "movimento")]
    kind: EntryKind,
    #[serde(default, alias = "historico")]
    description: String,
    #[serde(alias = "valor")]
    amount: Decimal,
    #[serde(default, alias = "selecionado", deserialize_with = "lenient_flag")]
    selected: bool,
}

/// Accepts `true`/`false`, `1`/`0` or `null`.
fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Bool(flag) => Ok(flag),
        Value::Number(number) => Ok(number.as_f64().map(|n| n != 0.0).unwrap_or(false)),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean selection flag, found {other}"
        ))),
    }
}

pub struct InterchangeService;

impl InterchangeService {
    /// Validates an import payload structurally and stages its entries.
    ///
    /// The whole payload is rejected with [`LedgerError::MalformedPayload`] when
    /// the top level is not an object, the entry array is missing, or any element
    /// is not entry-shaped, or when the amounts would overflow the running totals.
    /// Field values are not re-validated; suspicious values are reported in
    /// [`StagedImport::warnings`].
    pub fn parse_import(raw: &[u8]) -> Result<StagedImport> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|err| LedgerError::malformed(format!("payload is not valid JSON: {err}")))?;
        let object = document
            .as_object()
            .ok_or_else(|| LedgerError::malformed("expected a JSON object at the top level"))?;

        let (field, items) = ENTRY_ARRAY_FIELDS
            .iter()
            .find_map(|field| object.get(*field).map(|value| (*field, value)))
            .ok_or_else(|| LedgerError::malformed("missing `entries` array"))?;
        let items = items
            .as_array()
            .ok_or_else(|| LedgerError::malformed(format!("`{field}` is not an array")))?;

        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let position = index + 1;
            if !item.is_object() {
                return Err(LedgerError::malformed(format!(
                    "entry #{position} is not an object"
                )));
            }
            let imported = ImportedEntry::deserialize(item)
                .map_err(|err| LedgerError::malformed(format!("entry #{position}: {err}")))?;
            entries.push(imported.into_entry(position, &mut seen, &mut warnings));
        }

        let mut ordered: Vec<&Entry> = entries.iter().collect();
        ordered.sort_by_key(|entry| entry.date);
        BalanceService::totals(ordered).map_err(|err| {
            LedgerError::malformed(format!("imported amounts cannot be balanced: {err}"))
        })?;

        let exported_at = object
            .get("exportedAt")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|stamp| stamp.with_timezone(&Utc));
        let source_label = object
            .get("sourceLabel")
            .and_then(Value::as_str)
            .map(str::to_string);

        for warning in &warnings {
            tracing::warn!(%warning, "import payload anomaly");
        }
        tracing::info!(
            count = entries.len(),
            warnings = warnings.len(),
            "import payload staged"
        );

        Ok(StagedImport {
            entries,
            warnings,
            exported_at,
            source_label,
        })
    }

    pub fn export_document(
        entries: &[Entry],
        source_label: &str,
        exported_at: DateTime<Utc>,
    ) -> ExportDocument {
        ExportDocument {
            exported_at,
            source_label: source_label.to_string(),
            entries: entries.to_vec(),
        }
    }

    /// Serializes `document`, naming the file after the local export time.
    pub fn to_payload(document: &ExportDocument, local_time: NaiveDateTime) -> Result<ExportPayload> {
        let bytes = serde_json::to_vec_pretty(document).map_err(StorageError::from)?;
        Ok(ExportPayload {
            file_name: Self::export_file_name(&document.source_label, local_time),
            bytes,
        })
    }

    pub fn export_file_name(label: &str, local_time: NaiveDateTime) -> String {
        format!(
            "{}_{}_{}.json",
            EXPORT_FILE_PREFIX,
            slug(label),
            local_time.format(EXPORT_TIMESTAMP_FORMAT)
        )
    }
}

impl ImportedEntry {
    fn into_entry(
        self,
        position: usize,
        seen: &mut HashSet<Uuid>,
        warnings: &mut Vec<String>,
    ) -> Entry {
        let parsed = self
            .id
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok());
        let id = match parsed {
            Some(id) if seen.insert(id) => id,
            Some(id) => {
                warnings.push(format!(
                    "entry #{position} repeats id {id}; a new id was assigned"
                ));
                fresh_id(seen)
            }
            None => {
                if self.id.is_some() {
                    warnings.push(format!(
                        "entry #{position} has a non-UUID id; a new id was assigned"
                    ));
                }
                fresh_id(seen)
            }
        };

        if self.amount <= Decimal::ZERO {
            warnings.push(format!("entry #{position} has a non-positive amount"));
        }
        if self.description.trim().is_empty() {
            warnings.push(format!("entry #{position} has an empty description"));
        }

        Entry {
            id,
            date: self.date,
            kind: self.kind,
            description: self.description,
            amount: self.amount,
            running_balance: Decimal::ZERO,
            selected: self.selected,
        }
    }
}

fn fresh_id(seen: &mut HashSet<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    seen.insert(id);
    id
}

fn slug(label: &str) -> String {
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in label.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !sanitized.is_empty() && !last_dash {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        "ledger".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn malformed(raw: &str) -> String {
        match InterchangeService::parse_import(raw.as_bytes()) {
            Err(LedgerError::MalformedPayload(message)) => message,
            other => panic!("expected malformed payload, got {other:?}"),
        }
    }

    #[test]
    fn rejects_payload_without_entry_array() {
        assert!(malformed(r#"{"foo": 1}"#).contains("missing"));
        assert!(malformed(r#"{"entries": {"id": 1}}"#).contains("not an array"));
        assert!(malformed(r#"[1, 2, 3]"#).contains("object"));
        assert!(malformed("not json").contains("valid JSON"));
    }

    #[test]
    fn rejects_primitive_elements() {
        let message = malformed(r#"{"entries": [{"date": "2024-01-01", "kind": "entrada", "description": "x", "amount": 1}, 42]}"#);
        assert!(message.contains("#2"), "unexpected message: {message}");
    }

    #[test]
    fn stages_legacy_payload_with_numeric_ids() {
        let raw = r#"{
            "lancamentos": [
                {"id": 1700000000000, "data": "2023-11-14", "movimento": "entrada",
                 "historico": "Freelance", "valor": 800, "selecionado": 1},
                {"id": 1700000000001, "data": "2023-11-15", "movimento": "saida",
                 "historico": "Internet", "valor": 99.9, "selecionado": false}
            ]
        }"#;
        let staged = InterchangeService::parse_import(raw.as_bytes()).unwrap();
        assert_eq!(staged.count(), 2);
        assert!(staged.entries[0].selected);
        assert_eq!(staged.entries[1].amount, dec!(99.9));
        assert_eq!(staged.warnings.len(), 2);
        assert!(staged.warnings.iter().all(|w| w.contains("non-UUID")));
    }

    #[test]
    fn duplicate_ids_are_reassigned_and_reported() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"entries": [
                {{"id": "{id}", "date": "2024-01-01", "kind": "entrada", "description": "a", "amount": 1}},
                {{"id": "{id}", "date": "2024-01-02", "kind": "saida", "description": "b", "amount": 0}}
            ]}}"#
        );
        let staged = InterchangeService::parse_import(raw.as_bytes()).unwrap();
        assert_eq!(staged.entries[0].id, id);
        assert_ne!(staged.entries[1].id, id);
        assert!(staged.warnings.iter().any(|w| w.contains("repeats id")));
        assert!(staged.warnings.iter().any(|w| w.contains("non-positive")));
    }

    #[test]
    fn rejects_payload_whose_totals_overflow() {
        let raw = format!(
            r#"{{"entries": [
                {{"date": "2024-01-02", "kind": "entrada", "description": "b", "amount": 1}},
                {{"date": "2024-01-01", "kind": "entrada", "description": "a", "amount": {}}}
            ]}}"#,
            Decimal::MAX
        );
        let message = malformed(&raw);
        assert!(message.contains("overflow at entry #2"), "{message}");
    }

    #[test]
    fn exact_amounts_survive_staging() {
        let raw = r#"{"entries": [
            {"date": "2024-01-01", "kind": "entrada", "description": "a", "amount": 1000000000000000.01},
            {"date": "2024-01-02", "kind": "saida", "description": "b", "amount": "0.123456789012345678"}
        ]}"#;
        let staged = InterchangeService::parse_import(raw.as_bytes()).unwrap();
        assert_eq!(staged.entries[0].amount, dec!(1000000000000000.01));
        assert_eq!(staged.entries[1].amount, dec!(0.123456789012345678));
    }

    #[test]
    fn export_file_name_encodes_label_and_local_time() {
        let at = NaiveDate::from_ymd_opt(2024, 9, 3)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        let name = InterchangeService::export_file_name("Meu Extrato (casa)", at);
        assert_eq!(name, "extrato_meu-extrato-casa_2024-09-03_14-05-09.json");
        assert_eq!(
            InterchangeService::export_file_name("  ", at),
            "extrato_ledger_2024-09-03_14-05-09.json"
        );
    }
}
