//! Port interfaces for the audit ledger and change report

use async_trait::async_trait;
use cmdbsync_domain::{Result, RunMode};

use crate::report::{AuditEntry, ChangeRow};

/// Trait for the append-only audit ledger
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Trait for the cascade change report
#[async_trait]
pub trait ChangeReportSink: Send + Sync {
    /// Start a fresh report for this pass.
    async fn start(&self, mode: RunMode) -> Result<()>;

    async fn append(&self, row: &ChangeRow) -> Result<()>;
}
