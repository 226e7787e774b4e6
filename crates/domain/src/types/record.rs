//! Export records from the asset-management source

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{Result, SyncError};
use crate::types::status::OperationalStatus;

/// One row of a services or domains export.
///
/// Read once per run and never mutated. Scalar fields accept strings,
/// numbers and `{ "value": ... }` reference objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    #[serde(deserialize_with = "required_text")]
    pub sys_id: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub u_business_domain: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub operational_status: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub u_short_service_id: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub used_for: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub service_classification: Option<String>,
}

impl ExternalRecord {
    /// Display name, empty when the export carried none.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Status code mapped through the closed enumeration.
    pub fn status(&self) -> OperationalStatus {
        OperationalStatus::from_code(self.operational_status.as_deref())
    }

    /// Domain reference, trimmed; blank counts as absent.
    pub fn domain_ref(&self) -> Option<&str> {
        self.u_business_domain.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// An export row that could not be turned into an [`ExternalRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: String,
}

/// Parsed export: usable records plus the rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSnapshot {
    pub records: Vec<ExternalRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl ExportSnapshot {
    /// Find a record by its external identifier.
    pub fn find(&self, sys_id: &str) -> Option<&ExternalRecord> {
        self.records.iter().find(|r| r.sys_id == sys_id)
    }
}

/// Parse an export document.
///
/// Accepts a top-level array or an object holding the array under
/// `records` or `result`. Malformed rows are skipped and listed in
/// [`ExportSnapshot::rejected`]; a document of any other shape is an error.
pub fn parse_export(document: Value) -> Result<ExportSnapshot> {
    let rows = match document {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("result")) {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(SyncError::Data(
                    "export object has no `records` or `result` list".into(),
                ))
            }
        },
        other => {
            return Err(SyncError::Data(format!(
                "export must be a list or an object, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut snapshot = ExportSnapshot::default();
    for (index, row) in rows.into_iter().enumerate() {
        if !row.is_object() {
            snapshot
                .rejected
                .push(RejectedRecord { index, reason: format!("row is {}", json_kind(&row)) });
            continue;
        }
        match serde_json::from_value::<ExternalRecord>(row) {
            Ok(record) => snapshot.records.push(record),
            Err(err) => snapshot.rejected.push(RejectedRecord { index, reason: err.to_string() }),
        }
    }
    Ok(snapshot)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn scalar_text(value: Value) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Object(mut map) => match map.remove("value") {
            Some(inner) if !inner.is_object() => scalar_text(inner),
            _ => Err("reference object without a scalar `value`".into()),
        },
        Value::Array(_) => Err("expected a scalar, found a list".into()),
    }
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_text(value).map_err(serde::de::Error::custom)
}

fn required_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match optional_text(deserializer)? {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(serde::de::Error::custom("sys_id is empty")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_top_level_list() {
        let snapshot = parse_export(json!([
            { "sys_id": "A1", "name": "Payroll", "operational_status": 6 }
        ]))
        .unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].operational_status.as_deref(), Some("6"));
        assert_eq!(snapshot.records[0].status(), OperationalStatus::Retired);
    }

    #[test]
    fn accepts_records_and_result_wrappers() {
        let records = parse_export(json!({ "records": [{ "sys_id": "A1" }] })).unwrap();
        let result = parse_export(json!({ "result": [{ "sys_id": "B2" }] })).unwrap();
        assert_eq!(records.records[0].sys_id, "A1");
        assert_eq!(result.records[0].sys_id, "B2");
    }

    #[test]
    fn malformed_rows_are_rejected_not_fatal() {
        let snapshot = parse_export(json!([
            "not an object",
            { "name": "no id" },
            { "sys_id": "C3", "name": ["bad"] },
            { "sys_id": "D4", "u_business_domain": { "value": "DOM1", "link": "x" } }
        ]))
        .unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].domain_ref(), Some("DOM1"));
        let indexes: Vec<_> = snapshot.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn unknown_document_shape_is_an_error() {
        assert!(matches!(parse_export(json!("oops")), Err(SyncError::Data(_))));
        assert!(matches!(parse_export(json!({ "rows": [] })), Err(SyncError::Data(_))));
    }
}
