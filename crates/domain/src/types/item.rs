//! Work items held by the issue tracker

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A tracked work item representing a business service.
///
/// `custom_values` holds the display value of each requested custom field,
/// already flattened (`value`, else `name`, for option objects).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub key: String,
    pub external_id: Option<String>,
    pub summary: String,
    pub labels: BTreeSet<String>,
    pub custom_values: BTreeMap<String, String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
}

impl TrackedItem {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Current value of a custom field, if set.
    pub fn value(&self, field_id: &str) -> Option<&str> {
        self.custom_values.get(field_id).map(String::as_str)
    }
}
