//! # CMDB Sync Core
//!
//! Reconciliation engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the tracker, the option list, the domain
//!   table, the audit ledger and the change report
//! - The remote state reader, target builder, indices and comparator
//! - The operation applier
//! - One reconciliation service per sub-problem
//!
//! ## Architecture Principles
//! - Only depends on `cmdbsync-domain` and `cmdbsync-common`
//! - No HTTP, filesystem or platform code
//! - All external dependencies via traits
//! - Diffing is pure and testable without any port

pub mod applier;
pub mod audit;
pub mod compare;
pub mod identity;
pub mod index;
pub mod reader;
pub mod reconcile;
pub mod report;
pub mod target;

// Ports
pub mod audit_ports;
pub mod document_ports;
pub mod tracker_ports;

pub use applier::{ApplierSettings, OperationApplier};
pub use audit::AuditTrail;
pub use audit_ports::{AuditSink, ChangeReportSink};
pub use document_ports::DomainMappingSource;
pub use identity::ReporterResolver;
pub use reader::{fetch_all, Continuation, FetchOutcome, Page, PageCursor};
pub use reconcile::{CascadeReconciler, DomainReconciler, OptionIdReconciler, ServiceReconciler};
pub use report::{
    AuditEntry, CascadeSyncStats, ChangeRow, ChangeStatus, DomainSyncStats, LogLevel,
    OptionIdStats, PassReport, ServiceSyncStats,
};
pub use tracker_ports::{IssueTracker, ItemQuery, OptionStore, UserAccount};
