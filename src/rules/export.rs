//! Rule set import/export.
//!
//! The document format is shared with the SDK's preference exporter: a version
//! marker, an export timestamp, an optional scope, and a flat list of records
//! tagged with key, type, and value. Only `rule` records are materialized
//! here; the remaining value types exist so one document format round-trips
//! every field type the SDK can persist.

use std::collections::BTreeSet;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::models::NetworkRule;

const EXPORT_VERSION: &str = "1";
const RULES_SCOPE: &str = "network_rules";

/// One exported entry: a key plus a type-tagged value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub key: String,
    #[serde(flatten)]
    pub value: RecordValue,
}

/// Closed sum over every value type the export format supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecordValue {
    String(String),
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    StringSet(BTreeSet<String>),
    /// base64-encoded raw bytes
    Bytes(String),
    Rule(NetworkRule),
}

impl RecordValue {
    pub fn bytes(data: &[u8]) -> Self {
        RecordValue::Bytes(general_purpose::STANDARD.encode(data))
    }

    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        match self {
            RecordValue::Bytes(encoded) => general_purpose::STANDARD.decode(encoded).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: String,
    /// RFC 3339 export timestamp
    pub exported_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub records: Vec<ExportRecord>,
}

impl ExportDocument {
    fn new(scope: &str, records: Vec<ExportRecord>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now().to_rfc3339(),
            scope: Some(scope.to_string()),
            records,
        }
    }
}

/// Build the export document for a rule set.
pub fn export_rules(rules: &[NetworkRule]) -> ExportDocument {
    let records = rules
        .iter()
        .map(|rule| ExportRecord {
            key: rule.id.clone(),
            value: RecordValue::Rule(rule.clone()),
        })
        .collect();
    ExportDocument::new(RULES_SCOPE, records)
}

pub fn export_rules_to_string(rules: &[NetworkRule]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&export_rules(rules))?)
}

pub fn export_rules_to_path(path: &Path, rules: &[NetworkRule]) -> Result<(), ExportError> {
    let payload = export_rules_to_string(rules)?;
    std::fs::write(path, payload)?;
    tracing::info!(count = rules.len(), path = %path.display(), "exported rules");
    Ok(())
}

/// Parse an export document and return its rule records in document order.
/// Non-rule records are ignored; an unknown version is rejected.
pub fn import_rules_from_str(payload: &str) -> Result<Vec<NetworkRule>, ExportError> {
    let document: ExportDocument = serde_json::from_str(payload)?;
    if document.version != EXPORT_VERSION {
        return Err(ExportError::UnsupportedVersion(document.version));
    }
    Ok(document
        .records
        .into_iter()
        .filter_map(|record| match record.value {
            RecordValue::Rule(rule) => Some(rule),
            _ => None,
        })
        .collect())
}

pub fn import_rules_from_path(path: &Path) -> Result<Vec<NetworkRule>, ExportError> {
    let payload = std::fs::read_to_string(path)?;
    import_rules_from_str(&payload)
}
