//! Sync operations emitted by the comparator and consumed by the applier

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;
use crate::types::mapping::DomainRow;

/// Kind of pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Update,
    Move,
    Disable,
    Reactivate,
    Delete,
    LabelAdd,
    LabelRemove,
    CommentAdd,
    Reorder,
}

impl_domain_status_conversions!(OperationKind {
    Create => "create",
    Update => "update",
    Move => "move",
    Disable => "disable",
    Reactivate => "reactivate",
    Delete => "delete",
    LabelAdd => "label_add",
    LabelRemove => "label_remove",
    CommentAdd => "comment_add",
    Reorder => "reorder",
});

impl OperationKind {
    /// Writes that are followed by the short label-removal pause instead of
    /// the regular request delay.
    pub const fn is_label_removal(self) -> bool {
        matches!(self, Self::LabelRemove)
    }
}

/// Entity an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityRef {
    /// Existing tracked item.
    Item { key: String },
    /// Item that does not exist yet.
    NewItem { external_id: String },
    /// Child option, named by parent and child display names.
    Option { parent: String, child: String },
    /// Parent option (reorders).
    Parent { parent: String },
    /// Row of the domain table.
    DomainRow { sys_id: String },
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Item { key } => write!(f, "item {key}"),
            Self::NewItem { external_id } => write!(f, "new item for {external_id}"),
            Self::Option { parent, child } => write!(f, "option {parent} / {child}"),
            Self::Parent { parent } => write!(f, "parent option {parent}"),
            Self::DomainRow { sys_id } => write!(f, "domain row {sys_id}"),
        }
    }
}

/// Value written to a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free-text field.
    Text(String),
    /// Single select, written as `{ "value": ... }`.
    Select(String),
}

/// Everything needed to create a tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub project_key: String,
    pub issue_type: String,
    pub summary: String,
    pub external_id_field: String,
    pub external_id: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub labels: Vec<String>,
    pub reporter: Option<String>,
    pub description: Option<String>,
    /// Comment posted right after creation.
    pub comment: Option<String>,
}

/// Combined update of an existing tracked item, sent as one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanges {
    pub fields: BTreeMap<String, FieldValue>,
    pub summary: Option<String>,
    pub clear_assignee: bool,
    pub reporter: Option<String>,
    pub add_label: Option<String>,
    pub comment: Option<String>,
}

impl ItemChanges {
    /// True when fields or the summary change; only then is a comment added.
    pub fn touches_content(&self) -> bool {
        !self.fields.is_empty() || self.summary.is_some()
    }
}

/// Payload of a [`SyncOperation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OperationPayload {
    CreateItem(ItemDraft),
    UpdateItem(ItemChanges),
    SetField { field: String, value: String },
    AddLabel { label: String },
    RemoveLabel { label: String },
    AddComment { text: String },
    CreateOption { parent_id: String, value: String, disabled: bool },
    /// Disable the misfiled option, then create it under the right parent.
    MoveOption {
        from_parent: String,
        from_option_id: String,
        to_parent_id: String,
        value: String,
        disabled: bool,
    },
    SetOptionDisabled { option_id: String, disabled: bool },
    DeleteOption { option_id: String },
    ReorderOptions { parent_id: String, option_ids: Vec<String> },
    AppendDomainRow(DomainRow),
}

/// One pending change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOperation {
    pub kind: OperationKind,
    pub target: EntityRef,
    pub payload: OperationPayload,
    /// Digest of kind, target and payload; equal operations share a key.
    pub idempotency_key: String,
}

impl SyncOperation {
    pub fn new(kind: OperationKind, target: EntityRef, payload: OperationPayload) -> Self {
        let idempotency_key = idempotency_key(kind, &target, &payload);
        Self { kind, target, payload, idempotency_key }
    }

    /// Payload as JSON for the audit ledger.
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

fn idempotency_key(kind: OperationKind, target: &EntityRef, payload: &OperationPayload) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.to_string().as_bytes());
    hasher.update(&serde_json::to_vec(target).unwrap_or_default());
    hasher.update(&serde_json::to_vec(payload).unwrap_or_default());
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

/// Result of applying one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OperationStatus {
    Applied,
    Simulated,
    Failed(String),
    Skipped(String),
}

/// Per-operation outcome reported by the applier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub idempotency_key: String,
    pub kind: OperationKind,
    pub target: EntityRef,
    pub status: OperationStatus,
    /// Key or id assigned by the platform for creations.
    pub created_id: Option<String>,
    pub attempts: u32,
}

impl OperationOutcome {
    /// Applied or simulated.
    pub const fn succeeded(&self) -> bool {
        matches!(self.status, OperationStatus::Applied | OperationStatus::Simulated)
    }

    pub const fn failed(&self) -> bool {
        matches!(self.status, OperationStatus::Failed(_))
    }
}
