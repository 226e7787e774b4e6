//! Domain mapping source backed by the documentation page
//!
//! The parsed table and the page it came from are kept in a moka cache with
//! a time-to-live. Only successful reads are cached; a failed read leaves the
//! previous entry in place and returns the error. Row appends edit the
//! cached page, so an append after a load is a single page write.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cmdbsync_core::DomainMappingSource;
use cmdbsync_domain::{ConfluenceSettings, DomainMapping, DomainRow, Result};
use moka::sync::Cache;
use tracing::{debug, info, warn};

use super::client::{ConfluenceClient, StoragePage};
use super::table::{insert_row, parse_domain_table};

/// A page version and the mapping parsed from it.
#[derive(Debug, Clone)]
struct CachedTable {
    page: StoragePage,
    mapping: DomainMapping,
}

/// Domain table of one page, cached for `ttl`.
pub struct ConfluenceDomainTable {
    client: ConfluenceClient,
    page_id: String,
    table_id: String,
    cache: Cache<String, Arc<CachedTable>>,
}

impl ConfluenceDomainTable {
    pub fn new(client: ConfluenceClient, settings: &ConfluenceSettings, ttl: Duration) -> Self {
        Self {
            client,
            page_id: settings.page_id.clone(),
            table_id: settings.table_id.clone(),
            cache: Cache::builder().max_capacity(4).time_to_live(ttl).build(),
        }
    }

    /// Drop the cached mapping.
    pub fn invalidate(&self) {
        self.cache.invalidate(&self.page_id);
    }

    fn cached(&self) -> Option<Arc<CachedTable>> {
        self.cache.get(&self.page_id)
    }

    async fn fetch(&self) -> Result<Arc<CachedTable>> {
        let page = self.client.get_page(&self.page_id).await?;
        let mapping = parse_domain_table(&page.storage, &self.table_id)?;
        info!(page_id = %self.page_id, version = page.version, domains = mapping.len(), "domain mapping loaded");
        let table = Arc::new(CachedTable { page, mapping });
        self.cache.insert(self.page_id.clone(), Arc::clone(&table));
        Ok(table)
    }
}

impl std::fmt::Debug for ConfluenceDomainTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceDomainTable")
            .field("page_id", &self.page_id)
            .field("table_id", &self.table_id)
            .field("cached", &self.cached().is_some())
            .finish()
    }
}

#[async_trait]
impl DomainMappingSource for ConfluenceDomainTable {
    async fn load(&self, force_refresh: bool) -> Result<DomainMapping> {
        if !force_refresh {
            if let Some(table) = self.cached() {
                debug!(page_id = %self.page_id, domains = table.mapping.len(), "using cached domain mapping");
                return Ok(table.mapping.clone());
            }
        }
        Ok(self.fetch().await?.mapping.clone())
    }

    /// Write the row into the cached page version; the page is read first
    /// only when nothing is cached. A rejected write drops the cache so the
    /// next load sees the current version.
    async fn append_row(&self, row: &DomainRow) -> Result<()> {
        let table = match self.cached() {
            Some(table) => table,
            None => self.fetch().await?,
        };
        let updated = insert_row(&table.page.storage, &self.table_id, row)?;
        if let Err(err) = self.client.update_page(&table.page, &updated, &row.version_message()).await {
            warn!(page_id = %self.page_id, version = table.page.version, error = %err, "page write rejected; cache dropped");
            self.invalidate();
            return Err(err);
        }

        let page = StoragePage { version: table.page.version + 1, storage: updated, ..table.page.clone() };
        let mut mapping = table.mapping.clone();
        mapping.record_automation(row.to_entry());
        self.cache.insert(self.page_id.clone(), Arc::new(CachedTable { page, mapping }));
        Ok(())
    }
}
