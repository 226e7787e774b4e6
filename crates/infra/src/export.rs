//! Export file loading

use std::path::Path;

use cmdbsync_domain::{parse_export, ExportSnapshot, Result};
use tracing::{info, warn};

use crate::errors::infra;

/// Read and parse one export file.
///
/// A file that is missing or not JSON fails the load; malformed rows are
/// kept in [`ExportSnapshot::rejected`] for the caller to report.
pub async fn load_export(path: &Path) -> Result<ExportSnapshot> {
    let contents = tokio::fs::read_to_string(path).await.map_err(infra)?;
    let document: serde_json::Value = serde_json::from_str(&contents).map_err(infra)?;
    let snapshot = parse_export(document)?;

    info!(path = %path.display(), records = snapshot.records.len(), "export loaded");
    if !snapshot.rejected.is_empty() {
        warn!(path = %path.display(), rejected = snapshot.rejected.len(), "export rows skipped");
    }
    Ok(snapshot)
}
