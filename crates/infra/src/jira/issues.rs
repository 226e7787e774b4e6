//! Issue search and writes

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use cmdbsync_core::{Continuation, IssueTracker, ItemQuery, Page, PageCursor, UserAccount};
use cmdbsync_domain::constants::SEARCH_PAGE_SIZE;
use cmdbsync_domain::{FieldValue, ItemChanges, ItemDraft, Result, SyncError, TrackedItem};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use super::adf;
use crate::http::HttpClient;

const SEARCH_PATH: &str = "/rest/api/3/search/jql";
const ISSUE_PATH: &str = "/rest/api/3/issue";
const USER_SEARCH_PATH: &str = "/rest/api/3/user/search";

/// Fields returned with every search besides the requested custom fields.
const BASE_FIELDS: [&str; 4] = ["summary", "labels", "assignee", "reporter"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: &'a str,
    max_results: u32,
    fields: Vec<&'a str>,
    fields_by_keys: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueDto>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueDto {
    key: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    account_id: String,
    #[serde(default)]
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

/// Issue tracker backed by the Jira Cloud REST API v3.
#[derive(Debug, Clone)]
pub struct JiraIssueTracker {
    http: HttpClient,
}

impl JiraIssueTracker {
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn put_issue(&self, key: &str, body: &Value) -> Result<()> {
        let request = self.http.request(Method::PUT, &format!("{ISSUE_PATH}/{key}"))?.json(body);
        self.http.send_empty(request).await
    }
}

#[async_trait]
impl IssueTracker for JiraIssueTracker {
    #[instrument(skip(self, query), fields(jql = %query.jql))]
    async fn search_page(&self, query: &ItemQuery, cursor: &PageCursor) -> Result<Page<TrackedItem>> {
        let token = match cursor {
            PageCursor::Token(token) => token.as_deref(),
            PageCursor::Offset { .. } => {
                return Err(SyncError::Internal("issue search uses token paging".into()))
            }
        };

        let mut fields: Vec<&str> = BASE_FIELDS.to_vec();
        fields.extend(query.fields.iter().map(String::as_str));
        if let Some(id_field) = &query.external_id_field {
            fields.push(id_field.as_str());
        }
        fields.sort_unstable();
        fields.dedup();

        let body = SearchRequest {
            jql: &query.jql,
            max_results: SEARCH_PAGE_SIZE,
            fields,
            fields_by_keys: true,
            next_page_token: token,
        };
        let request = self.http.request(Method::POST, SEARCH_PATH)?.json(&body);
        let response: SearchResponse = self.http.send_json(request).await?;
        debug!(issues = response.issues.len(), more = response.next_page_token.is_some(), "search page");

        let items = response
            .issues
            .into_iter()
            .map(|issue| to_tracked_item(issue, query.external_id_field.as_deref()))
            .collect();
        Ok(Page::new(items, Continuation::Token(response.next_page_token)))
    }

    async fn search_users(&self, query: &str) -> Result<Vec<UserAccount>> {
        let request = self.http.request(Method::GET, USER_SEARCH_PATH)?.query(&[("query", query)]);
        let users: Vec<UserDto> = self.http.send_json(request).await?;
        Ok(users
            .into_iter()
            .map(|u| UserAccount { account_id: u.account_id, email: u.email_address })
            .collect())
    }

    #[instrument(skip(self, draft), fields(external_id = %draft.external_id))]
    async fn create_item(&self, draft: &ItemDraft) -> Result<String> {
        let request = self.http.request(Method::POST, ISSUE_PATH)?.json(&create_body(draft));
        let created: CreatedIssue = self.http.send_json(request).await?;
        Ok(created.key)
    }

    async fn update_item(&self, key: &str, changes: &ItemChanges) -> Result<()> {
        self.put_issue(key, &update_body(changes)).await
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.put_issue(key, &json!({ "fields": { field: value } })).await
    }

    async fn add_label(&self, key: &str, label: &str) -> Result<()> {
        self.put_issue(key, &json!({ "update": { "labels": [{ "add": label }] } })).await
    }

    async fn remove_label(&self, key: &str, label: &str) -> Result<()> {
        self.put_issue(key, &json!({ "update": { "labels": [{ "remove": label }] } })).await
    }

    async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        let request = self
            .http
            .request(Method::POST, &format!("{ISSUE_PATH}/{key}/comment"))?
            .json(&json!({ "body": adf::paragraph(text) }));
        self.http.send_empty(request).await
    }
}

fn field_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Select(option) => json!({ "value": option }),
    }
}

fn create_body(draft: &ItemDraft) -> Value {
    let mut fields = Map::new();
    fields.insert("project".into(), json!({ "key": draft.project_key }));
    fields.insert("issuetype".into(), json!({ "name": draft.issue_type }));
    fields.insert("summary".into(), Value::String(draft.summary.clone()));
    fields.insert("labels".into(), json!(draft.labels));
    fields.insert("assignee".into(), Value::Null);
    if let Some(reporter) = &draft.reporter {
        fields.insert("reporter".into(), json!({ "accountId": reporter }));
    }
    if let Some(description) = &draft.description {
        fields.insert("description".into(), adf::paragraph(description));
    }
    fields.insert(draft.external_id_field.clone(), Value::String(draft.external_id.clone()));
    for (field, value) in &draft.fields {
        fields.insert(field.clone(), field_json(value));
    }
    json!({ "fields": fields })
}

fn update_body(changes: &ItemChanges) -> Value {
    let mut update = Map::new();
    if let Some(label) = &changes.add_label {
        update.insert("labels".into(), json!([{ "add": label }]));
    }
    if let Some(comment) = &changes.comment {
        update.insert("comment".into(), json!([{ "add": { "body": adf::paragraph(comment) } }]));
    }

    let mut fields = Map::new();
    if changes.clear_assignee {
        fields.insert("assignee".into(), Value::Null);
    }
    if let Some(reporter) = &changes.reporter {
        fields.insert("reporter".into(), json!({ "accountId": reporter }));
    }
    if let Some(summary) = &changes.summary {
        fields.insert("summary".into(), Value::String(summary.clone()));
    }
    for (field, value) in &changes.fields {
        fields.insert(field.clone(), field_json(value));
    }

    let mut body = Map::new();
    if !update.is_empty() {
        body.insert("update".into(), Value::Object(update));
    }
    if !fields.is_empty() {
        body.insert("fields".into(), Value::Object(fields));
    }
    Value::Object(body)
}

/// Display text of a custom field value: strings and numbers as-is, option
/// objects by `value` then `name`. Anything else counts as absent.
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(object) => object
            .get("value")
            .or_else(|| object.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Null | Value::Array(_) => None,
    }
}

fn account_id(value: Option<&Value>) -> Option<String> {
    value.and_then(|v| v.get("accountId")).and_then(Value::as_str).map(str::to_string)
}

fn to_tracked_item(issue: IssueDto, external_id_field: Option<&str>) -> TrackedItem {
    let IssueDto { key, mut fields } = issue;

    let summary = fields.remove("summary").and_then(|v| v.as_str().map(str::to_string));
    let labels: BTreeSet<String> = fields
        .remove("labels")
        .and_then(|v| v.as_array().cloned())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    let assignee = account_id(fields.get("assignee"));
    let reporter = account_id(fields.get("reporter"));
    fields.remove("assignee");
    fields.remove("reporter");

    let custom_values: BTreeMap<String, String> = fields
        .iter()
        .filter_map(|(field, value)| display_value(value).map(|text| (field.clone(), text)))
        .collect();
    let external_id = external_id_field
        .and_then(|field| custom_values.get(field))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    TrackedItem {
        key,
        external_id,
        summary: summary.unwrap_or_default(),
        labels,
        custom_values,
        assignee,
        reporter,
    }
}
