//! Atlassian document format for comments and descriptions

use serde_json::{json, Value};

/// One-paragraph document holding plain text.
pub fn paragraph(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }]
        }]
    })
}
