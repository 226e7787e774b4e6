//! Shared helpers for the adapter integration tests.

#![allow(dead_code)]

use std::time::Duration;

use cmdbsync_infra::HttpClient;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Client pointed at the mock server, one attempt, no backoff.
pub fn client(server: &MockServer) -> HttpClient {
    HttpClient::builder(&server.uri())
        .basic_auth("robot@example.org", "token")
        .max_attempts(1)
        .base_backoff(Duration::ZERO)
        .build()
        .expect("http client")
}

/// Search response issue with the given custom values.
pub fn issue(key: &str, summary: &str, fields: Value) -> Value {
    let mut all = json!({ "summary": summary, "labels": [], "assignee": null, "reporter": null });
    if let (Some(all), Some(extra)) = (all.as_object_mut(), fields.as_object()) {
        for (k, v) in extra {
            all.insert(k.clone(), v.clone());
        }
    }
    json!({ "id": "1", "key": key, "fields": all })
}

/// Confluence page body holding a domain table with `rows` of
/// `(sys_id, display)`.
pub fn page(version: u64, table_id: &str, rows: &[(&str, &str)]) -> Value {
    let body: String = rows
        .iter()
        .map(|(id, name)| format!("<tr><td><p>{id}</p></td><td><p>{name}</p></td></tr>"))
        .collect();
    json!({
        "id": "123",
        "title": "Business domain automation",
        "version": { "number": version },
        "body": { "storage": {
            "value": format!(
                "<p>intro</p><table ac:local-id=\"{table_id}\"><tbody><tr><th>sys_id</th><th>Domain</th></tr>{body}</tbody></table>"
            ),
            "representation": "storage"
        } }
    })
}
