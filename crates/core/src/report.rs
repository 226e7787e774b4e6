//! Counters, audit entries and change-report rows

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use cmdbsync_domain::{OperationOutcome, RunMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Severity of a log line or ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Forward a message to the matching `tracing` macro.
    pub fn emit(self, context: &str, message: &str) {
        match self {
            Self::Debug => debug!(context = %context, "{message}"),
            Self::Info => info!(context = %context, "{message}"),
            Self::Warning => warn!(context = %context, "{message}"),
            Self::Error => error!(context = %context, "{message}"),
        }
    }
}

/// One line of the durable audit ledger. The ledger adds the run id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub context: String,
    pub message: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl AuditEntry {
    pub fn new(level: LogLevel, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            context: context.into(),
            message: message.into(),
            detail: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// Decision recorded for one option in the cascade change report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeStatus {
    ToAdd,
    ToMove,
    ToDisable,
    ToReactivate,
    Ok,
    DeletedPlanned,
    ParentMissing,
}

impl ChangeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToAdd => "To add",
            Self::ToMove => "To move",
            Self::ToDisable => "To disable",
            Self::ToReactivate => "To reactivate",
            Self::Ok => "OK",
            Self::DeletedPlanned => "DELETED (Status 20)",
            Self::ParentMissing => "Parent missing",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the cascade change report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    pub timestamp: NaiveDateTime,
    pub mode: RunMode,
    pub parent: String,
    pub child: String,
    pub status: ChangeStatus,
}

impl ChangeRow {
    pub fn now(mode: RunMode, parent: &str, child: &str, status: ChangeStatus) -> Self {
        Self {
            timestamp: chrono::Local::now().naive_local(),
            mode,
            parent: parent.to_string(),
            child: child.to_string(),
            status,
        }
    }
}

/// Counters of the service-record pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceSyncStats {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub labels_removed: usize,
    /// Records skipped as data faults or by the exclusion rules.
    pub excluded: usize,
    pub errors: usize,
}

impl fmt::Display for ServiceSyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} created={} updated={} unchanged={} labels_removed={} excluded={} errors={}",
            self.processed,
            self.created,
            self.updated,
            self.unchanged,
            self.labels_removed,
            self.excluded,
            self.errors
        )
    }
}

/// Counters of the domain backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainSyncStats {
    pub executed: usize,
    pub not_found: usize,
    pub activated: usize,
    pub planned_added: usize,
    pub retired_added: usize,
    pub errors: usize,
}

impl fmt::Display for DomainSyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "executed={} not_found={} activated={} planned_added={} retired_added={} errors={}",
            self.executed,
            self.not_found,
            self.activated,
            self.planned_added,
            self.retired_added,
            self.errors
        )
    }
}

/// Counters of the cascade option pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeSyncStats {
    pub added: usize,
    pub moved: usize,
    pub disabled: usize,
    pub reactivated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub parents_missing: usize,
    pub reordered: usize,
    /// Services whose domain could not be resolved.
    pub unresolved: usize,
    pub errors: usize,
}

impl fmt::Display for CascadeSyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} moved={} disabled={} reactivated={} deleted={} ok={} parents_missing={} \
             reordered={} unresolved={} errors={}",
            self.added,
            self.moved,
            self.disabled,
            self.reactivated,
            self.deleted,
            self.unchanged,
            self.parents_missing,
            self.reordered,
            self.unresolved,
            self.errors
        )
    }
}

/// Counters of the option-id backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptionIdStats {
    pub updated: usize,
    pub unchanged: usize,
    pub unresolved: usize,
    pub errors: usize,
}

impl fmt::Display for OptionIdStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updated={} unchanged={} unresolved={} errors={}",
            self.updated, self.unchanged, self.unresolved, self.errors
        )
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport<S> {
    pub stats: S,
    pub outcomes: Vec<OperationOutcome>,
}

impl<S> PassReport<S> {
    pub fn failed_outcomes(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.failed())
    }
}
