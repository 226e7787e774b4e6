//! Recording fakes for the domain table, the audit ledger and the change
//! report

use async_trait::async_trait;
use cmdbsync_core::{AuditEntry, AuditSink, ChangeReportSink, ChangeRow, DomainMappingSource, LogLevel};
use cmdbsync_domain::{DomainEntry, DomainMapping, DomainRow, EntrySource, Result, RunMode};
use parking_lot::Mutex;

/// Domain table held in memory.
#[derive(Default)]
pub struct InMemoryDomainTable {
    mapping: Mutex<DomainMapping>,
    appended: Mutex<Vec<DomainRow>>,
    loads: Mutex<Vec<bool>>,
}

impl InMemoryDomainTable {
    /// Rows `(sys_id, name, qualifier)` as read from the document.
    pub fn with_rows(rows: &[(&str, &str, Option<cmdbsync_domain::DomainQualifier>)]) -> Self {
        let table = Self::default();
        {
            let mut mapping = table.mapping.lock();
            for (sys_id, name, qualifier) in rows {
                mapping.insert_document(DomainEntry {
                    sys_id: (*sys_id).into(),
                    name: (*name).into(),
                    qualifier: *qualifier,
                    source: EntrySource::Document,
                });
            }
        }
        table
    }

    pub fn appended(&self) -> Vec<DomainRow> {
        self.appended.lock().clone()
    }

    /// `force_refresh` flag of every load, in order.
    pub fn loads(&self) -> Vec<bool> {
        self.loads.lock().clone()
    }

    pub fn mapping(&self) -> DomainMapping {
        self.mapping.lock().clone()
    }
}

#[async_trait]
impl DomainMappingSource for InMemoryDomainTable {
    async fn load(&self, force_refresh: bool) -> Result<DomainMapping> {
        self.loads.lock().push(force_refresh);
        Ok(self.mapping.lock().clone())
    }

    async fn append_row(&self, row: &DomainRow) -> Result<()> {
        self.appended.lock().push(row.clone());
        self.mapping.lock().record_automation(row.to_entry());
        Ok(())
    }
}

/// Keeps every ledger entry.
#[derive(Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<AuditEntry> {
        self.entries.lock().iter().filter(|e| e.level == level).cloned().collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}

/// Keeps the rows of the latest report.
#[derive(Default)]
pub struct RecordingReport {
    rows: Mutex<Vec<ChangeRow>>,
    starts: Mutex<Vec<RunMode>>,
}

impl RecordingReport {
    pub fn rows(&self) -> Vec<ChangeRow> {
        self.rows.lock().clone()
    }

    pub fn starts(&self) -> Vec<RunMode> {
        self.starts.lock().clone()
    }
}

#[async_trait]
impl ChangeReportSink for RecordingReport {
    async fn start(&self, mode: RunMode) -> Result<()> {
        self.starts.lock().push(mode);
        self.rows.lock().clear();
        Ok(())
    }

    async fn append(&self, row: &ChangeRow) -> Result<()> {
        self.rows.lock().push(row.clone());
        Ok(())
    }
}
