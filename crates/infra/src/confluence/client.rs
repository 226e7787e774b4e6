//! Page read and write through the Confluence REST API

use cmdbsync_domain::{Result, SyncError};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::http::HttpClient;

const CONTENT_PATH: &str = "/wiki/rest/api/content";

/// A page with its storage-format body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePage {
    pub id: String,
    pub title: String,
    pub version: u64,
    pub storage: String,
}

#[derive(Debug, Deserialize)]
struct PageDto {
    title: String,
    version: VersionDto,
    body: BodyDto,
}

#[derive(Debug, Deserialize)]
struct VersionDto {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct BodyDto {
    storage: StorageDto,
}

#[derive(Debug, Deserialize)]
struct StorageDto {
    value: String,
}

#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: HttpClient,
}

impl ConfluenceClient {
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    #[instrument(skip(self))]
    pub async fn get_page(&self, page_id: &str) -> Result<StoragePage> {
        let request = self
            .http
            .request(Method::GET, &format!("{CONTENT_PATH}/{page_id}"))?
            .query(&[("expand", "body.storage,version")]);
        let page: PageDto = self.http.send_json(request).await.map_err(|err| match err {
            SyncError::Http { status: 404, .. } => SyncError::NotFound(format!("page {page_id}")),
            other => other,
        })?;
        Ok(StoragePage {
            id: page_id.to_string(),
            title: page.title,
            version: page.version.number,
            storage: page.body.storage.value,
        })
    }

    /// Write `storage` as the next version of `page`.
    #[instrument(skip(self, page, storage), fields(page_id = %page.id, version = page.version + 1))]
    pub async fn update_page(&self, page: &StoragePage, storage: &str, message: &str) -> Result<()> {
        let body = json!({
            "id": page.id,
            "type": "page",
            "title": page.title,
            "version": { "number": page.version + 1, "message": message },
            "body": { "storage": { "value": storage, "representation": "storage" } }
        });
        let request = self.http.request(Method::PUT, &format!("{CONTENT_PATH}/{}", page.id))?.json(&body);
        self.http.send_empty(request).await?;
        info!(page_id = %page.id, message, "page updated");
        Ok(())
    }
}
