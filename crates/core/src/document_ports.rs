//! Port interface for the domain mapping table

use async_trait::async_trait;
use cmdbsync_domain::{DomainMapping, DomainRow, Result};

/// Trait for the domain mapping kept in the documentation page
///
/// Implementations cache the parsed table for a short validity window;
/// `force_refresh` bypasses the cache.
#[async_trait]
pub trait DomainMappingSource: Send + Sync {
    /// Current mapping, read from the table or the cache.
    async fn load(&self, force_refresh: bool) -> Result<DomainMapping>;

    /// Append a row to the table and record it in the cached mapping.
    async fn append_row(&self, row: &DomainRow) -> Result<()>;
}
