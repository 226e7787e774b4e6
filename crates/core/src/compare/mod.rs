//! State comparator
//!
//! Pure diff functions: given target and indexed current state they return
//! the operations that converge one onto the other.

pub mod cascade;
pub mod domains;
pub mod services;

pub use cascade::{diff_cascade, reorder_operations, CascadeDecision, CascadePlan};
pub use domains::{
    append_row_op, field_fill_ops, group_candidates, missing_rows, resolve_domain,
    DomainResolution, TableAddition,
};
pub use services::{diff_services, ServiceDiffContext, ServiceFieldIds, ServicePlan, SkippedRecord};
