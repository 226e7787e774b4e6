//! CSV change report of the cascade pass

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cmdbsync_core::{ChangeReportSink, ChangeRow};
use cmdbsync_domain::{Result, RunMode, SyncError};
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::infra;

const HEADER: [&str; 5] = ["Date/Time", "Mode", "Parent", "Child", "Status"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Report file rewritten at the start of every cascade pass.
#[derive(Debug)]
pub struct CsvChangeReport {
    path: PathBuf,
    writer: Mutex<Option<csv::Writer<File>>>,
}

impl CsvChangeReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), writer: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChangeReportSink for CsvChangeReport {
    async fn start(&self, mode: RunMode) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(infra)?;
        }
        let mut writer = csv::Writer::from_path(&self.path).map_err(infra)?;
        writer.write_record(HEADER).map_err(infra)?;
        writer.flush().map_err(infra)?;
        debug!(path = %self.path.display(), mode = %mode, "change report started");
        *self.writer.lock() = Some(writer);
        Ok(())
    }

    async fn append(&self, row: &ChangeRow) -> Result<()> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| SyncError::Internal("change report appended before start".into()))?;
        let timestamp = row.timestamp.format(TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                timestamp.as_str(),
                row.mode.report_label(),
                row.parent.as_str(),
                row.child.as_str(),
                row.status.as_str(),
            ])
            .map_err(infra)?;
        writer.flush().map_err(infra)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use cmdbsync_core::ChangeStatus;

    use super::*;

    fn row(child: &str, status: ChangeStatus) -> ChangeRow {
        ChangeRow {
            timestamp: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(6, 5, 4).unwrap(),
            mode: RunMode::Simulate,
            parent: "Finance".into(),
            child: child.into(),
            status,
        }
    }

    #[tokio::test]
    async fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let report = CsvChangeReport::new(dir.path().join("sync_report.csv"));

        report.start(RunMode::Simulate).await.unwrap();
        report.append(&row("Billing, EU", ChangeStatus::ToAdd)).await.unwrap();
        report.append(&row("Payroll", ChangeStatus::DeletedPlanned)).await.unwrap();

        let contents = std::fs::read_to_string(report.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Date/Time,Mode,Parent,Child,Status");
        assert_eq!(lines[1], "2026-03-01 06:05:04,diagnostic,Finance,\"Billing, EU\",To add");
        assert_eq!(lines[2], "2026-03-01 06:05:04,diagnostic,Finance,Payroll,DELETED (Status 20)");
    }

    #[tokio::test]
    async fn start_truncates_the_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = CsvChangeReport::new(dir.path().join("sync_report.csv"));

        report.start(RunMode::Apply).await.unwrap();
        report.append(&row("Billing", ChangeStatus::Ok)).await.unwrap();
        report.start(RunMode::Apply).await.unwrap();

        let contents = std::fs::read_to_string(report.path()).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn append_before_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let report = CsvChangeReport::new(dir.path().join("r.csv"));
        assert!(report.append(&row("x", ChangeStatus::Ok)).await.is_err());
    }
}
