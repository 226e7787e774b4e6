//! Target state builder
//!
//! Pure transformations from export snapshots to the desired shape of each
//! reconciliation pass. Nothing here performs I/O or mutates its input.

use std::collections::{BTreeMap, BTreeSet};

use cmdbsync_domain::constants::EXCLUDED_NAME;
use cmdbsync_domain::{
    normalize_name, DomainLifecycle, ExportSnapshot, ExternalRecord, TargetChild, TargetParent,
    TargetTree,
};

/// True for the catch-all `All` record that never takes part in a sync.
pub fn is_excluded_name(record: &ExternalRecord) -> bool {
    record.display_name().trim() == EXCLUDED_NAME
}

/// Service records split into the ones to reconcile and the excluded ones.
#[derive(Debug, Default)]
pub struct ServiceTargets<'a> {
    pub records: Vec<&'a ExternalRecord>,
    pub excluded: Vec<&'a ExternalRecord>,
}

impl ServiceTargets<'_> {
    /// External identifiers of every record taking part in the pass.
    pub fn identifiers(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.sys_id.as_str()).collect()
    }
}

pub fn service_targets(snapshot: &ExportSnapshot) -> ServiceTargets<'_> {
    let (excluded, records): (Vec<_>, Vec<_>) =
        snapshot.records.iter().partition(|r| is_excluded_name(r));
    ServiceTargets { records, excluded }
}

/// Domain records by lifecycle.
#[derive(Debug, Default)]
pub struct DomainPartition<'a> {
    pub active: Vec<&'a ExternalRecord>,
    pub planned: Vec<&'a ExternalRecord>,
    pub retired: Vec<&'a ExternalRecord>,
    /// Domains with any other status; left alone.
    pub other: Vec<&'a ExternalRecord>,
    /// `All` rows.
    pub ignored: usize,
}

impl<'a> DomainPartition<'a> {
    /// Active, planned and retired domains with their lifecycle.
    pub fn classified(&self) -> impl Iterator<Item = (&'a ExternalRecord, DomainLifecycle)> + '_ {
        self.active
            .iter()
            .map(|r| (*r, DomainLifecycle::Active))
            .chain(self.planned.iter().map(|r| (*r, DomainLifecycle::Planned)))
            .chain(self.retired.iter().map(|r| (*r, DomainLifecycle::Retired)))
    }
}

pub fn partition_domains(snapshot: &ExportSnapshot) -> DomainPartition<'_> {
    let mut partition = DomainPartition::default();
    for record in &snapshot.records {
        if is_excluded_name(record) {
            partition.ignored += 1;
            continue;
        }
        match DomainLifecycle::from(&record.status()) {
            DomainLifecycle::Active => partition.active.push(record),
            DomainLifecycle::Planned => partition.planned.push(record),
            DomainLifecycle::Retired => partition.retired.push(record),
            DomainLifecycle::Other => partition.other.push(record),
        }
    }
    partition
}

/// A service left out of the option tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedService {
    pub sys_id: String,
    pub reason: String,
}

/// Desired option tree plus the services that could not be placed in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeTarget {
    pub tree: TargetTree,
    pub unresolved: Vec<UnresolvedService>,
}

/// Build the desired option tree from the services and domains exports.
///
/// Services are grouped under the display name of their domain. Planned
/// services go to the hard-delete set, retired ones are kept but disabled.
/// Names are merged case-insensitively; a child listed twice stays enabled
/// if any copy is enabled.
pub fn cascade_target(services: &ExportSnapshot, domains: &ExportSnapshot) -> CascadeTarget {
    let domain_names: BTreeMap<&str, &str> = domains
        .records
        .iter()
        .filter(|d| !is_excluded_name(d))
        .filter_map(|d| {
            let name = d.display_name().trim();
            (!name.is_empty()).then_some((d.sys_id.as_str(), name))
        })
        .collect();

    // normalized parent -> (display name, normalized child -> child)
    let mut parents: BTreeMap<String, (String, BTreeMap<String, TargetChild>)> = BTreeMap::new();
    let mut planned = BTreeSet::new();
    let mut unresolved = Vec::new();

    for service in &services.records {
        if is_excluded_name(service) {
            continue;
        }
        let name = service.display_name().trim();
        if name.is_empty() {
            unresolved.push(UnresolvedService {
                sys_id: service.sys_id.clone(),
                reason: "service has no name".into(),
            });
            continue;
        }
        let Some(domain_ref) = service.domain_ref() else {
            unresolved.push(UnresolvedService {
                sys_id: service.sys_id.clone(),
                reason: "service has no business domain".into(),
            });
            continue;
        };
        let Some(parent_name) = domain_names.get(domain_ref) else {
            unresolved.push(UnresolvedService {
                sys_id: service.sys_id.clone(),
                reason: format!("unknown business domain {domain_ref}"),
            });
            continue;
        };

        let status = service.status();
        if status.is_planned() {
            planned.insert(normalize_name(name));
            continue;
        }

        let (_, children) = parents
            .entry(normalize_name(parent_name))
            .or_insert_with(|| ((*parent_name).to_string(), BTreeMap::new()));
        let disabled = status.is_retired();
        children
            .entry(normalize_name(name))
            .and_modify(|child| child.disabled &= disabled)
            .or_insert_with(|| TargetChild { name: name.to_string(), disabled });
    }

    let mut tree = TargetTree::default();
    for (_, (name, children)) in parents {
        let children: Vec<TargetChild> = children.into_values().collect();
        tree.parents.push(TargetParent { name, children });
    }

    // A name still wanted somewhere must not be hard-deleted.
    let wanted: BTreeSet<String> = tree
        .parents
        .iter()
        .flat_map(|p| p.children.iter().map(|c| normalize_name(&c.name)))
        .collect();
    tree.planned_deletes = planned.difference(&wanted).cloned().collect();

    CascadeTarget { tree, unresolved }
}
