//! Two-level cascading select options

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::utils::naming::normalize_name;

/// Raw option as listed by the tracker. Options without a parent id are
/// top-level parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOption {
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Child option under a parent in the current tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeChild {
    pub id: String,
    pub name: String,
    pub disabled: bool,
}

/// Parent option with its children, in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentParent {
    pub id: String,
    pub name: String,
    pub children: Vec<CascadeChild>,
}

/// Observed option tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTree {
    pub parents: Vec<CurrentParent>,
    /// Children whose parent id matched no listed parent.
    pub orphans: Vec<CascadeOption>,
}

impl CurrentTree {
    /// Assemble the tree from a flat option listing.
    pub fn from_options(options: Vec<CascadeOption>) -> Self {
        let (parents, children): (Vec<_>, Vec<_>) =
            options.into_iter().partition(|option| option.parent_id.is_none());

        let mut tree = Self {
            parents: parents
                .into_iter()
                .map(|p| CurrentParent { id: p.id, name: p.value, children: Vec::new() })
                .collect(),
            orphans: Vec::new(),
        };

        for child in children {
            let parent = child
                .parent_id
                .as_deref()
                .and_then(|pid| tree.parents.iter_mut().find(|p| p.id == pid));
            match parent {
                Some(parent) => parent.children.push(CascadeChild {
                    id: child.id,
                    name: child.value,
                    disabled: child.disabled,
                }),
                None => tree.orphans.push(child),
            }
        }
        tree
    }

    /// Parent whose normalized name matches.
    pub fn parent(&self, name: &str) -> Option<&CurrentParent> {
        let key = normalize_name(name);
        self.parents.iter().find(|p| normalize_name(&p.name) == key)
    }
}

/// Desired child under a target parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetChild {
    pub name: String,
    pub disabled: bool,
}

/// Desired parent with its children sorted case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetParent {
    pub name: String,
    pub children: Vec<TargetChild>,
}

/// Desired option tree plus the normalized names of planned services whose
/// options must be deleted outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTree {
    pub parents: Vec<TargetParent>,
    pub planned_deletes: BTreeSet<String>,
}

impl TargetTree {
    pub fn child_count(&self) -> usize {
        self.parents.iter().map(|p| p.children.len()).sum()
    }

    /// Normalized `(parent, child)` names of every wanted child.
    pub fn wanted_pairs(&self) -> BTreeSet<(String, String)> {
        self.parents
            .iter()
            .flat_map(|p| {
                let parent = normalize_name(&p.name);
                p.children.iter().map(move |c| (parent.clone(), normalize_name(&c.name)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: &str, value: &str, parent: Option<&str>) -> CascadeOption {
        CascadeOption {
            id: id.into(),
            value: value.into(),
            disabled: false,
            parent_id: parent.map(str::to_string),
        }
    }

    #[test]
    fn assembles_parents_and_children() {
        let tree = CurrentTree::from_options(vec![
            option("10", "Finance", None),
            option("99", "Billing", Some("10")),
            option("11", "HR", None),
            option("77", "Lost", Some("404")),
        ]);
        assert_eq!(tree.parents.len(), 2);
        assert_eq!(tree.parent("finance").map(|p| p.children.len()), Some(1));
        assert_eq!(tree.parent(" HR ").map(|p| p.id.as_str()), Some("11"));
        assert_eq!(tree.orphans.len(), 1);
    }
}
