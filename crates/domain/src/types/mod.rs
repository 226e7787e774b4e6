//! Domain data types used throughout the reconciliation passes

pub mod cascade;
pub mod item;
pub mod mapping;
pub mod operation;
pub mod record;
pub mod status;

pub use cascade::{
    CascadeChild, CascadeOption, CurrentParent, CurrentTree, TargetChild, TargetParent, TargetTree,
};
pub use item::TrackedItem;
pub use mapping::{DomainEntry, DomainMapping, DomainQualifier, DomainRow, EntrySource, TableCell};
pub use operation::{
    EntityRef, FieldValue, ItemChanges, ItemDraft, OperationKind, OperationOutcome, OperationPayload,
    OperationStatus, SyncOperation,
};
pub use record::{parse_export, ExportSnapshot, ExternalRecord, RejectedRecord};
pub use status::{DomainLifecycle, OperationalStatus};
