//! Audit trail shared by the reconciliation services

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::audit_ports::AuditSink;
use crate::report::{AuditEntry, LogLevel};

/// Logs every entry immediately and appends it to the ledger when one is
/// attached. A ledger write failure is logged and never escalates.
#[derive(Clone, Default)]
pub struct AuditTrail {
    sink: Option<Arc<dyn AuditSink>>,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Trail that only logs.
    pub fn log_only() -> Self {
        Self::default()
    }

    pub async fn record(&self, level: LogLevel, context: &str, message: &str, detail: Value) {
        level.emit(context, message);
        if let Some(sink) = &self.sink {
            let entry = AuditEntry::new(level, context, message).with_detail(detail);
            if let Err(err) = sink.record(entry).await {
                warn!(context = %context, error = %err, "audit ledger write failed");
            }
        }
    }

    pub async fn info(&self, context: &str, message: &str, detail: Value) {
        self.record(LogLevel::Info, context, message, detail).await;
    }

    pub async fn warning(&self, context: &str, message: &str, detail: Value) {
        self.record(LogLevel::Warning, context, message, detail).await;
    }

    pub async fn error(&self, context: &str, message: &str, detail: Value) {
        self.record(LogLevel::Error, context, message, detail).await;
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail").field("ledger", &self.sink.is_some()).finish()
    }
}
