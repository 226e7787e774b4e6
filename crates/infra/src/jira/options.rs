//! Option list of the cascading select field

use async_trait::async_trait;
use cmdbsync_core::{Continuation, OptionStore, Page, PageCursor};
use cmdbsync_domain::{CascadeOption, Result, SyncError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::http::HttpClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionDto {
    id: String,
    value: String,
    #[serde(default)]
    option_id: Option<String>,
    #[serde(default)]
    disabled: bool,
}

impl From<OptionDto> for CascadeOption {
    fn from(dto: OptionDto) -> Self {
        Self { id: dto.id, value: dto.value, disabled: dto.disabled, parent_id: dto.option_id }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionPage {
    #[serde(default)]
    values: Vec<OptionDto>,
    #[serde(default)]
    is_last: Option<bool>,
    #[serde(default)]
    total: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewOption<'a> {
    value: &'a str,
    disabled: bool,
    option_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedOptions {
    #[serde(default)]
    options: Vec<CreatedOption>,
}

#[derive(Debug, Deserialize)]
struct CreatedOption {
    id: String,
}

/// Options of one cascading select field context.
#[derive(Debug, Clone)]
pub struct JiraOptionStore {
    http: HttpClient,
    base_path: String,
}

impl JiraOptionStore {
    pub fn new(http: HttpClient, field_id: &str, context_id: &str) -> Self {
        Self { http, base_path: format!("/rest/api/3/field/{field_id}/context/{context_id}/option") }
    }

    fn option_path(&self, option_id: &str) -> String {
        format!("{}/{option_id}", self.base_path)
    }
}

#[async_trait]
impl OptionStore for JiraOptionStore {
    async fn list_page(&self, cursor: &PageCursor) -> Result<Page<CascadeOption>> {
        let PageCursor::Offset { start_at, max_results } = cursor else {
            return Err(SyncError::Internal("option listing uses offset paging".into()));
        };
        let request = self
            .http
            .request(Method::GET, &self.base_path)?
            .query(&[("startAt", start_at), ("maxResults", max_results)]);
        let page: OptionPage = self.http.send_json(request).await?;
        debug!(start_at, options = page.values.len(), is_last = ?page.is_last, "option page");

        Ok(Page::new(
            page.values.into_iter().map(CascadeOption::from).collect(),
            Continuation::Offset { is_last: page.is_last, total: page.total },
        ))
    }

    #[instrument(skip(self))]
    async fn create_option(&self, parent_id: &str, value: &str, disabled: bool) -> Result<String> {
        let body = json!({ "options": [NewOption { value, disabled, option_id: parent_id }] });
        let request = self.http.request(Method::POST, &self.base_path)?.json(&body);
        let created: CreatedOptions = self.http.send_json(request).await?;
        created
            .options
            .into_iter()
            .next()
            .map(|o| o.id)
            .ok_or_else(|| SyncError::Data(format!("option '{value}' created without an id")))
    }

    async fn set_disabled(&self, option_id: &str, disabled: bool) -> Result<()> {
        let request = self
            .http
            .request(Method::PUT, &self.option_path(option_id))?
            .json(&json!({ "disabled": disabled }));
        self.http.send_empty(request).await
    }

    async fn delete_option(&self, option_id: &str) -> Result<()> {
        let request = self.http.request(Method::DELETE, &self.option_path(option_id))?;
        self.http.send_empty(request).await
    }

    async fn move_to_first(&self, option_ids: &[String]) -> Result<()> {
        let request = self
            .http
            .request(Method::PUT, &self.option_path("move"))?
            .json(&json!({ "customFieldOptionIds": option_ids, "position": "First" }));
        self.http.send_empty(request).await
    }
}
