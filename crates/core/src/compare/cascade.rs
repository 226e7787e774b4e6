//! Cascading option tree diff
//!
//! Every target child is searched across the whole current tree, because a
//! child can sit under the wrong parent. The expected parent is searched
//! first so a correct copy wins over a misfiled duplicate, and an option the
//! target also wants where it sits is never taken as a move source.

use std::collections::BTreeSet;

use cmdbsync_domain::{
    normalize_name, CurrentTree, EntityRef, OperationKind, OperationPayload, SyncOperation,
    TargetTree,
};

use crate::index::OptionTreeIndex;
use crate::report::ChangeStatus;

/// One decision of the cascade pass with the operations it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeDecision {
    pub parent: String,
    pub child: String,
    pub status: ChangeStatus,
    pub operation: Option<SyncOperation>,
}

impl CascadeDecision {
    fn new(parent: &str, child: &str, status: ChangeStatus, operation: Option<SyncOperation>) -> Self {
        Self { parent: parent.to_string(), child: child.to_string(), status, operation }
    }
}

/// Decisions of the cascade pass, grouped in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadePlan {
    /// Hard deletes of planned services, applied before anything else.
    pub deletes: Vec<CascadeDecision>,
    /// Creates, moves, reactivations and the OK / parent-missing notes.
    pub decisions: Vec<CascadeDecision>,
    /// Disables of obsolete children.
    pub sweep: Vec<CascadeDecision>,
}

impl CascadePlan {
    pub fn all(&self) -> impl Iterator<Item = &CascadeDecision> {
        self.deletes.iter().chain(&self.decisions).chain(&self.sweep)
    }

    pub fn operations(&self) -> impl Iterator<Item = &SyncOperation> {
        self.all().filter_map(|d| d.operation.as_ref())
    }

    pub fn operation_count(&self) -> usize {
        self.operations().count()
    }
}

fn option_ref(parent: &str, child: &str) -> EntityRef {
    EntityRef::Option { parent: parent.to_string(), child: child.to_string() }
}

fn set_disabled(parent: &str, child: &str, option_id: &str, disabled: bool) -> SyncOperation {
    let kind = if disabled { OperationKind::Disable } else { OperationKind::Reactivate };
    SyncOperation::new(
        kind,
        option_ref(parent, child),
        OperationPayload::SetOptionDisabled { option_id: option_id.to_string(), disabled },
    )
}

/// Compute the decisions converging the current tree onto the target.
pub fn diff_cascade(target: &TargetTree, index: &OptionTreeIndex) -> CascadePlan {
    let mut plan = CascadePlan::default();
    // Option ids already taken care of by a delete or a move.
    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    let wanted_pairs = target.wanted_pairs();

    for parent in &index.tree().parents {
        for child in &parent.children {
            if target.planned_deletes.contains(&normalize_name(&child.name)) {
                claimed.insert(child.id.as_str());
                plan.deletes.push(CascadeDecision::new(
                    &parent.name,
                    &child.name,
                    ChangeStatus::DeletedPlanned,
                    Some(SyncOperation::new(
                        OperationKind::Delete,
                        option_ref(&parent.name, &child.name),
                        OperationPayload::DeleteOption { option_id: child.id.clone() },
                    )),
                ));
            }
        }
    }

    for target_parent in &target.parents {
        let Some(current_parent) = index.parent(&target_parent.name) else {
            plan.decisions.push(CascadeDecision::new(
                &target_parent.name,
                "",
                ChangeStatus::ParentMissing,
                None,
            ));
            continue;
        };

        for wanted in &target_parent.children {
            if let Some(existing) = index.child_in(&current_parent.name, &wanted.name) {
                let decision = match (existing.disabled, wanted.disabled) {
                    (true, false) => CascadeDecision::new(
                        &current_parent.name,
                        &wanted.name,
                        ChangeStatus::ToReactivate,
                        Some(set_disabled(&current_parent.name, &wanted.name, &existing.id, false)),
                    ),
                    (false, true) => CascadeDecision::new(
                        &current_parent.name,
                        &wanted.name,
                        ChangeStatus::ToDisable,
                        Some(set_disabled(&current_parent.name, &wanted.name, &existing.id, true)),
                    ),
                    _ => CascadeDecision::new(&current_parent.name, &wanted.name, ChangeStatus::Ok, None),
                };
                plan.decisions.push(decision);
                continue;
            }

            let misfiled = index
                .locate(&wanted.name)
                .into_iter()
                .find(|location| {
                    !claimed.contains(location.child.id.as_str())
                        && !wanted_pairs.contains(&(
                            normalize_name(&location.parent.name),
                            normalize_name(&location.child.name),
                        ))
                });

            let decision = match misfiled {
                Some(location) => {
                    claimed.insert(location.child.id.as_str());
                    CascadeDecision::new(
                        &current_parent.name,
                        &wanted.name,
                        ChangeStatus::ToMove,
                        Some(SyncOperation::new(
                            OperationKind::Move,
                            option_ref(&current_parent.name, &wanted.name),
                            OperationPayload::MoveOption {
                                from_parent: location.parent.name.clone(),
                                from_option_id: location.child.id.clone(),
                                to_parent_id: current_parent.id.clone(),
                                value: wanted.name.clone(),
                                disabled: wanted.disabled,
                            },
                        )),
                    )
                }
                None => CascadeDecision::new(
                    &current_parent.name,
                    &wanted.name,
                    ChangeStatus::ToAdd,
                    Some(SyncOperation::new(
                        OperationKind::Create,
                        option_ref(&current_parent.name, &wanted.name),
                        OperationPayload::CreateOption {
                            parent_id: current_parent.id.clone(),
                            value: wanted.name.clone(),
                            disabled: wanted.disabled,
                        },
                    )),
                ),
            };
            plan.decisions.push(decision);
        }
    }

    for parent in &index.tree().parents {
        let parent_key = normalize_name(&parent.name);
        for child in &parent.children {
            if child.disabled
                || claimed.contains(child.id.as_str())
                || wanted_pairs.contains(&(parent_key.clone(), normalize_name(&child.name)))
            {
                continue;
            }
            plan.sweep.push(CascadeDecision::new(
                &parent.name,
                &child.name,
                ChangeStatus::ToDisable,
                Some(set_disabled(&parent.name, &child.name, &child.id, true)),
            ));
        }
    }

    plan
}

/// One reorder per parent whose children are not in case-insensitive order.
pub fn reorder_operations(tree: &CurrentTree) -> Vec<SyncOperation> {
    tree.parents
        .iter()
        .filter(|parent| {
            parent
                .children
                .windows(2)
                .any(|pair| normalize_name(&pair[0].name) > normalize_name(&pair[1].name))
        })
        .map(|parent| {
            let mut children: Vec<_> = parent.children.iter().collect();
            children.sort_by_key(|c| normalize_name(&c.name));
            SyncOperation::new(
                OperationKind::Reorder,
                EntityRef::Parent { parent: parent.name.clone() },
                OperationPayload::ReorderOptions {
                    parent_id: parent.id.clone(),
                    option_ids: children.into_iter().map(|c| c.id.clone()).collect(),
                },
            )
        })
        .collect()
}
