//! Append-only JSON Lines audit ledger

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cmdbsync_core::{AuditEntry, AuditSink, LogLevel};
use cmdbsync_domain::Result;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::infra;

#[derive(Serialize)]
struct LedgerLine<'a> {
    timestamp: DateTime<Utc>,
    run_id: Uuid,
    level: LogLevel,
    context: &'a str,
    message: &'a str,
    detail: &'a serde_json::Value,
}

/// One JSON object per line, tagged with the run id.
#[derive(Debug)]
pub struct JsonlAuditLedger {
    path: PathBuf,
    run_id: Uuid,
    file: Mutex<File>,
}

impl JsonlAuditLedger {
    /// Open `path` for appending, creating it and its directory if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(infra)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).await.map_err(infra)?;
        Ok(Self { path, run_id: Uuid::now_v7(), file: Mutex::new(file) })
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLedger {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        let line = LedgerLine {
            timestamp: entry.timestamp,
            run_id: self.run_id,
            level: entry.level,
            context: &entry.context,
            message: &entry.message,
            detail: &entry.detail,
        };
        let mut bytes = serde_json::to_vec(&line).map_err(infra)?;
        bytes.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&bytes).await.map_err(infra)?;
        file.flush().await.map_err(infra)
    }
}
