//! Adapter dependency changers
//!
//! An adapter may refine the order of its own changes. Its changer is
//! wrapped so it only sees, and can only edit, the part of the graph that
//! belongs to the adapter.

use crate::adapter::AdapterRegistry;
use crate::graph::{ChangeMap, DependencyChange, DependencyMap};
use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Custom dependency edits for a set of changes
pub trait DependencyChanger: Send + Sync {
    fn change_dependencies(
        &self,
        changes: &ChangeMap,
        deps: &DependencyMap,
    ) -> Result<Vec<DependencyChange>>;
}

impl<F> DependencyChanger for F
where
    F: Fn(&ChangeMap, &DependencyMap) -> Result<Vec<DependencyChange>> + Send + Sync,
{
    fn change_dependencies(
        &self,
        changes: &ChangeMap,
        deps: &DependencyMap,
    ) -> Result<Vec<DependencyChange>> {
        self(changes, deps)
    }
}

/// Copy of the changes of one adapter and the edges among them
///
/// An edge is kept only if its source and target both belong to the
/// adapter. The inputs are not modified.
pub fn filter_for_adapter(
    changes: &ChangeMap,
    deps: &DependencyMap,
    adapter: &str,
) -> (ChangeMap, DependencyMap) {
    let changes: ChangeMap = changes
        .iter()
        .filter(|(_, change)| change.adapter() == adapter)
        .map(|(id, change)| (id.clone(), change.clone()))
        .collect();

    let deps: DependencyMap = deps
        .iter()
        .filter(|(source, _)| changes.contains_key(*source))
        .filter_map(|(source, targets)| {
            let targets: BTreeSet<_> = targets
                .iter()
                .filter(|target| changes.contains_key(*target))
                .cloned()
                .collect();
            (!targets.is_empty()).then(|| (source.clone(), targets))
        })
        .collect();

    (changes, deps)
}

/// A changer confined to the changes of one adapter
#[derive(Clone)]
pub struct AdapterDependencyChanger {
    adapter: String,
    changer: Arc<dyn DependencyChanger>,
}

impl AdapterDependencyChanger {
    pub fn new(adapter: impl Into<String>, changer: Arc<dyn DependencyChanger>) -> Self {
        Self {
            adapter: adapter.into(),
            changer,
        }
    }

    pub fn adapter(&self) -> &str {
        &self.adapter
    }
}

impl DependencyChanger for AdapterDependencyChanger {
    /// Run the wrapped changer on this adapter's partition
    ///
    /// Edits naming a change outside the partition are dropped.
    fn change_dependencies(
        &self,
        changes: &ChangeMap,
        deps: &DependencyMap,
    ) -> Result<Vec<DependencyChange>> {
        let (changes, deps) = filter_for_adapter(changes, deps, &self.adapter);
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let edits = self.changer.change_dependencies(&changes, &deps)?;
        let total = edits.len();
        let edits: Vec<DependencyChange> = edits
            .into_iter()
            .filter(|edit| {
                changes.contains_key(edit.source()) && changes.contains_key(edit.target())
            })
            .collect();
        if edits.len() < total {
            log::warn!(
                "Dropped {} dependency edits of adapter '{}' that leave its changes",
                total - edits.len(),
                self.adapter
            );
        }
        log::debug!("Adapter '{}' changed {} dependencies", self.adapter, edits.len());
        Ok(edits)
    }
}

impl std::fmt::Debug for AdapterDependencyChanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterDependencyChanger")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

/// Adapter-scoped changers of every registered adapter that has one
pub fn get_adapter_dependency_changers(
    registry: &AdapterRegistry,
) -> Vec<AdapterDependencyChanger> {
    registry
        .adapters()
        .filter_map(|adapter| {
            adapter
                .dependency_changer()
                .map(|changer| AdapterDependencyChanger::new(adapter.name(), changer))
        })
        .collect()
}
