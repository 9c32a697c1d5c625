//! Diff computation for elements

use crate::change::{Change, ChangeAction, ChangeId};
use crate::graph::DependencyMap;
use elements::{Element, ObjectType, PathId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Compute the changes that turn `before` into `after`
///
/// Top-level elements are matched by id. Object types present on both sides
/// are compared field by field: each field gets its own add/remove/modify,
/// and the type gets a modify whenever anything in it differs. That modify
/// carries the whole desired type, so applying it applies the field changes
/// too. Output is sorted by change id.
pub fn compute_changes(before: &[Element], after: &[Element]) -> Vec<Change> {
    let before_by_id: BTreeMap<PathId, &Element> = before.iter().map(|e| (e.id(), e)).collect();
    let after_by_id: BTreeMap<PathId, &Element> = after.iter().map(|e| (e.id(), e)).collect();

    let mut changes = Vec::new();
    for (id, old) in &before_by_id {
        match after_by_id.get(id) {
            None => changes.push(Change::remove((*old).clone())),
            Some(new) => diff_element(old, new, &mut changes),
        }
    }
    for (id, new) in &after_by_id {
        if !before_by_id.contains_key(id) {
            changes.push(Change::add((*new).clone()));
        }
    }

    changes.sort_by_key(Change::id);
    log::debug!("Computed {} changes", changes.len());
    changes
}

fn diff_element(old: &Element, new: &Element, changes: &mut Vec<Change>) {
    match (old, new) {
        (Element::Object(old_type), Element::Object(new_type)) => {
            diff_object_type(old_type, new_type, changes);
        }
        _ if old != new => changes.push(Change::modify(old.clone(), new.clone())),
        _ => {}
    }
}

fn diff_object_type(old: &ObjectType, new: &ObjectType, changes: &mut Vec<Change>) {
    if old == new {
        return;
    }
    changes.push(Change::modify(old.clone(), new.clone()));

    for (name, old_field) in &old.fields {
        match new.fields.get(name) {
            None => changes.push(Change::remove(old_field.clone())),
            Some(new_field) if new_field != old_field => {
                changes.push(Change::modify(old_field.clone(), new_field.clone()));
            }
            Some(_) => {}
        }
    }
    for (name, new_field) in &new.fields {
        if !old.fields.contains_key(name) {
            changes.push(Change::add(new_field.clone()));
        }
    }
}

/// Ordering edges between changes and the change of their parent type
///
/// For a field, or an instance, whose type also changes:
/// - the type is added before its children are added or modified
/// - children are removed before the type is removed
/// - a modified type is applied before children are added
pub fn default_dependencies(changes: &[Change]) -> DependencyMap {
    let by_element: HashMap<PathId, (ChangeId, ChangeAction)> = changes
        .iter()
        .map(|c| (c.element_id(), (c.id(), c.action())))
        .collect();

    let mut deps = DependencyMap::new();
    for change in changes {
        let element_id = change.element_id();
        if element_id.kind() == elements::IdKind::Type {
            continue;
        }
        let parent_type = PathId::type_id(element_id.adapter(), element_id.name());
        let Some((parent_change, parent_action)) = by_element.get(&parent_type) else {
            continue;
        };

        let edge = match (parent_action, change.action()) {
            (ChangeAction::Add, ChangeAction::Add | ChangeAction::Modify) => {
                Some((change.id(), parent_change.clone()))
            }
            (ChangeAction::Remove, ChangeAction::Remove) => {
                Some((parent_change.clone(), change.id()))
            }
            (ChangeAction::Modify, ChangeAction::Add) => Some((change.id(), parent_change.clone())),
            _ => None,
        };

        if let Some((source, target)) = edge {
            log::debug!("{source} depends on {target}");
            deps.entry(source).or_insert_with(BTreeSet::new).insert(target);
        }
    }
    deps
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of elements to add
    pub additions: usize,
    /// Number of elements to remove
    pub removals: usize,
    /// Number of elements to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of changes
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action() {
                ChangeAction::Add => summary.additions += 1,
                ChangeAction::Remove => summary.removals += 1,
                ChangeAction::Modify => summary.modifications += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group changes by adapter namespace
pub fn group_by_adapter(changes: &[Change]) -> BTreeMap<String, Vec<&Change>> {
    let mut groups: BTreeMap<String, Vec<&Change>> = BTreeMap::new();
    for change in changes {
        groups
            .entry(change.adapter().to_string())
            .or_default()
            .push(change);
    }
    groups
}
