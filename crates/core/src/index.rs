//! Lookup indices over the current remote state
//!
//! Built once per pass so the comparator never calls the remote side per
//! target record.

use std::collections::HashMap;

use cmdbsync_domain::{
    name_index_key, normalize_name, strip_retired_prefixes, CascadeChild, CurrentParent,
    CurrentTree, TrackedItem,
};

/// How a target record was matched to a tracked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    ExternalId,
    Name,
}

/// Tracked items indexed by external identifier and by normalized name.
///
/// When two items share a key the later one in listing order wins.
#[derive(Debug, Default)]
pub struct ItemIndex {
    items: Vec<TrackedItem>,
    by_external_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl ItemIndex {
    pub fn build(items: Vec<TrackedItem>) -> Self {
        let mut by_external_id = HashMap::new();
        let mut by_name = HashMap::new();
        for (position, item) in items.iter().enumerate() {
            if let Some(id) = item.external_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
                by_external_id.insert(id.to_string(), position);
            }
            if let Some(key) = name_index_key(&item.summary) {
                by_name.insert(key, position);
            }
        }
        Self { items, by_external_id, by_name }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn by_external_id(&self, external_id: &str) -> Option<&TrackedItem> {
        self.by_external_id.get(external_id.trim()).map(|&i| &self.items[i])
    }

    /// Item whose summary names the service, ignoring retirement prefixes.
    pub fn by_name(&self, name: &str) -> Option<&TrackedItem> {
        let key = normalize_name(strip_retired_prefixes(name.trim()));
        self.by_name.get(&key).map(|&i| &self.items[i])
    }

    /// Identifier lookup first, then the name fallback.
    pub fn resolve(&self, external_id: &str, name: &str) -> Option<(&TrackedItem, MatchKind)> {
        self.by_external_id(external_id)
            .map(|item| (item, MatchKind::ExternalId))
            .or_else(|| self.by_name(name).map(|item| (item, MatchKind::Name)))
    }

    /// Items reachable through the identifier index, one per identifier.
    pub fn identified(&self) -> impl Iterator<Item = (&str, &TrackedItem)> {
        self.by_external_id.iter().map(|(id, &i)| (id.as_str(), &self.items[i]))
    }

    pub fn items(&self) -> &[TrackedItem] {
        &self.items
    }
}

/// Where a child option currently sits.
#[derive(Debug, Clone, Copy)]
pub struct OptionLocation<'a> {
    pub parent: &'a CurrentParent,
    pub child: &'a CascadeChild,
}

/// Current option tree with name lookups for parents and children.
#[derive(Debug, Default)]
pub struct OptionTreeIndex {
    tree: CurrentTree,
    parents: HashMap<String, usize>,
    // normalized child name -> (parent position, child position), tree order
    children: HashMap<String, Vec<(usize, usize)>>,
}

impl OptionTreeIndex {
    pub fn build(tree: CurrentTree) -> Self {
        let mut parents = HashMap::new();
        let mut children: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
        for (p, parent) in tree.parents.iter().enumerate() {
            parents.entry(normalize_name(&parent.name)).or_insert(p);
            for (c, child) in parent.children.iter().enumerate() {
                children.entry(normalize_name(&child.name)).or_default().push((p, c));
            }
        }
        Self { tree, parents, children }
    }

    pub const fn tree(&self) -> &CurrentTree {
        &self.tree
    }

    pub fn parent(&self, name: &str) -> Option<&CurrentParent> {
        self.parents.get(&normalize_name(name)).map(|&p| &self.tree.parents[p])
    }

    /// Child with the given name under the given parent.
    pub fn child_in(&self, parent: &str, child: &str) -> Option<&CascadeChild> {
        let key = normalize_name(child);
        self.parent(parent)?.children.iter().find(|c| normalize_name(&c.name) == key)
    }

    /// Every place a child name appears, in tree order.
    pub fn locate(&self, child: &str) -> Vec<OptionLocation<'_>> {
        self.children
            .get(&normalize_name(child))
            .map(|positions| {
                positions
                    .iter()
                    .map(|&(p, c)| {
                        let parent = &self.tree.parents[p];
                        OptionLocation { parent, child: &parent.children[c] }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
