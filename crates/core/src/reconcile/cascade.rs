//! Cascading option reconciliation

use std::sync::Arc;

use cmdbsync_domain::{ExportSnapshot, OperationOutcome, Result, RunMode};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::load_option_tree;
use crate::applier::OperationApplier;
use crate::audit::AuditTrail;
use crate::audit_ports::ChangeReportSink;
use crate::compare::{diff_cascade, reorder_operations, CascadeDecision, CascadePlan};
use crate::index::OptionTreeIndex;
use crate::report::{CascadeSyncStats, ChangeRow, ChangeStatus, PassReport};
use crate::target::cascade_target;
use crate::tracker_ports::OptionStore;

const CONTEXT: &str = "cascade";

/// Keeps the two-level option tree of the cascading field in step with the
/// domains and services exports.
pub struct CascadeReconciler {
    options: Arc<dyn OptionStore>,
    applier: Arc<OperationApplier>,
    report: Option<Arc<dyn ChangeReportSink>>,
    audit: AuditTrail,
}

impl CascadeReconciler {
    pub fn new(options: Arc<dyn OptionStore>, applier: Arc<OperationApplier>) -> Self {
        Self { options, applier, report: None, audit: AuditTrail::log_only() }
    }

    /// Write one change-report row per decision.
    pub fn with_report(mut self, report: Arc<dyn ChangeReportSink>) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    /// Load the option tree and compute the plan without applying it.
    pub async fn plan(&self, services: &ExportSnapshot, domains: &ExportSnapshot) -> Result<CascadePlan> {
        let target = cascade_target(services, domains);
        let index = OptionTreeIndex::build(load_option_tree(self.options.as_ref()).await?);
        Ok(diff_cascade(&target.tree, &index))
    }

    #[instrument(skip_all, fields(services = services.records.len(), domains = domains.records.len()))]
    pub async fn run(
        &self,
        services: &ExportSnapshot,
        domains: &ExportSnapshot,
    ) -> Result<PassReport<CascadeSyncStats>> {
        let mode = self.applier.mode();
        let mut stats = CascadeSyncStats::default();
        let mut outcomes = Vec::new();

        if let Some(report) = &self.report {
            if let Err(err) = report.start(mode).await {
                warn!(error = %err, "change report could not be started");
            }
        }

        let target = cascade_target(services, domains);
        stats.unresolved = target.unresolved.len();
        for service in &target.unresolved {
            self.audit
                .warning(
                    CONTEXT,
                    &format!("service {} left out of the option tree: {}", service.sys_id, service.reason),
                    json!({ "sys_id": service.sys_id, "reason": service.reason }),
                )
                .await;
        }

        let index = OptionTreeIndex::build(load_option_tree(self.options.as_ref()).await?);
        info!(
            target_parents = target.tree.parents.len(),
            target_children = target.tree.child_count(),
            planned = target.tree.planned_deletes.len(),
            current_parents = index.tree().parents.len(),
            "option trees loaded"
        );

        let plan = diff_cascade(&target.tree, &index);
        info!(operations = plan.operation_count(), "cascade plan ready");

        for decision in plan.all() {
            self.write_row(mode, decision).await;
            let Some(operation) = &decision.operation else {
                match decision.status {
                    ChangeStatus::Ok => stats.unchanged += 1,
                    ChangeStatus::ParentMissing => {
                        stats.parents_missing += 1;
                        self.audit
                            .warning(
                                CONTEXT,
                                &format!("parent option '{}' does not exist", decision.parent),
                                json!({ "parent": decision.parent }),
                            )
                            .await;
                    }
                    _ => {}
                }
                continue;
            };

            let outcome = self.applier.apply(operation).await;
            if outcome.failed() {
                stats.errors += 1;
            } else if outcome.succeeded() {
                match decision.status {
                    ChangeStatus::ToAdd => stats.added += 1,
                    ChangeStatus::ToMove => stats.moved += 1,
                    ChangeStatus::ToDisable => stats.disabled += 1,
                    ChangeStatus::ToReactivate => stats.reactivated += 1,
                    ChangeStatus::DeletedPlanned => stats.deleted += 1,
                    ChangeStatus::Ok | ChangeStatus::ParentMissing => {}
                }
            }
            outcomes.push(outcome);
        }

        self.reorder(mode, &index, &mut stats, &mut outcomes).await;

        info!(%stats, "cascade pass finished");
        Ok(PassReport { stats, outcomes })
    }

    /// Sort children of every unsorted parent. Apply mode re-reads the tree
    /// so freshly created options are included.
    async fn reorder(
        &self,
        mode: RunMode,
        before: &OptionTreeIndex,
        stats: &mut CascadeSyncStats,
        outcomes: &mut Vec<OperationOutcome>,
    ) {
        let operations = if mode.is_simulate() {
            reorder_operations(before.tree())
        } else {
            match load_option_tree(self.options.as_ref()).await {
                Ok(tree) => reorder_operations(&tree),
                Err(err) => {
                    stats.errors += 1;
                    self.audit
                        .error(
                            CONTEXT,
                            "option tree could not be re-read; children were not reordered",
                            json!({ "error": err }),
                        )
                        .await;
                    return;
                }
            }
        };

        for outcome in self.applier.apply_all(&operations).await {
            if outcome.failed() {
                stats.errors += 1;
            } else if outcome.succeeded() {
                stats.reordered += 1;
            }
            outcomes.push(outcome);
        }
    }

    async fn write_row(&self, mode: RunMode, decision: &CascadeDecision) {
        let Some(report) = &self.report else { return };
        let row = ChangeRow::now(mode, &decision.parent, &decision.child, decision.status);
        if let Err(err) = report.append(&row).await {
            warn!(error = %err, parent = %decision.parent, child = %decision.child, "change report row not written");
        }
    }
}
