//! Dependency graph over changes

use crate::change::{Change, ChangeId};
use crate::dependency::filter_for_adapter;
use crate::error::{Error, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Changes keyed by their id
pub type ChangeMap = BTreeMap<ChangeId, Change>;

/// For each change, the ids of the changes it depends on
pub type DependencyMap = BTreeMap<ChangeId, BTreeSet<ChangeId>>;

/// An edit to the dependency edges
///
/// `source` depends on `target`: `target` must be applied first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DependencyChange {
    Add { source: ChangeId, target: ChangeId },
    Remove { source: ChangeId, target: ChangeId },
}

impl DependencyChange {
    pub fn add(source: impl Into<ChangeId>, target: impl Into<ChangeId>) -> Self {
        Self::Add {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn remove(source: impl Into<ChangeId>, target: impl Into<ChangeId>) -> Self {
        Self::Remove {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Add { source, .. } | Self::Remove { source, .. } => source,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Add { target, .. } | Self::Remove { target, .. } => target,
        }
    }
}

/// Changes plus the ordering constraints between them
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    changes: ChangeMap,
    deps: DependencyMap,
}

impl DependencyGraph {
    /// Build a graph, rejecting duplicate changes and edges to unknown ids
    pub fn new(changes: impl IntoIterator<Item = Change>, deps: &DependencyMap) -> Result<Self> {
        let mut graph = Self::default();
        for change in changes {
            let id = change.id();
            if graph.changes.contains_key(&id) {
                return Err(Error::DuplicateChange { id });
            }
            graph.changes.insert(id, change);
        }
        for (source, targets) in deps {
            for target in targets {
                graph.add_edge(source, target)?;
            }
        }
        log::debug!(
            "Dependency graph: {} changes, {} edges",
            graph.changes.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    pub fn changes(&self) -> &ChangeMap {
        &self.changes
    }

    pub fn dependencies(&self) -> &DependencyMap {
        &self.deps
    }

    pub fn get(&self, id: &str) -> Option<&Change> {
        self.changes.get(id)
    }

    /// Ids `id` depends on
    pub fn dependencies_of(&self, id: &str) -> impl Iterator<Item = &ChangeId> {
        self.deps.get(id).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.deps.values().map(BTreeSet::len).sum()
    }

    /// Make `source` depend on `target`; returns whether the edge is new
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<bool> {
        if source == target {
            return Err(Error::SelfLoop {
                id: source.to_string(),
            });
        }
        for id in [source, target] {
            if !self.changes.contains_key(id) {
                return Err(Error::UnknownChange { id: id.to_string() });
            }
        }
        Ok(self
            .deps
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string()))
    }

    /// Drop an edge; returns whether it was present
    pub fn remove_edge(&mut self, source: &str, target: &str) -> bool {
        let Some(targets) = self.deps.get_mut(source) else {
            return false;
        };
        let removed = targets.remove(target);
        if targets.is_empty() {
            self.deps.remove(source);
        }
        removed
    }

    /// Apply a batch of edits in order
    pub fn apply(&mut self, edits: impl IntoIterator<Item = DependencyChange>) -> Result<()> {
        for edit in edits {
            match &edit {
                DependencyChange::Add { source, target } => {
                    self.add_edge(source, target)?;
                }
                DependencyChange::Remove { source, target } => {
                    self.remove_edge(source, target);
                }
            }
            log::trace!("Applied dependency edit {edit:?}");
        }
        Ok(())
    }

    /// Copy of the changes and edges that belong to one adapter
    ///
    /// Only edges with both ends inside the partition are kept. The graph
    /// itself is left untouched.
    pub fn partition(&self, adapter: &str) -> (ChangeMap, DependencyMap) {
        filter_for_adapter(&self.changes, &self.deps, adapter)
    }

    /// Every set of changes that depend on each other in a cycle
    pub fn find_cycles(&self) -> Vec<Vec<ChangeId>> {
        find_cycles(self.changes.keys().map(String::as_str), &self.deps)
    }

    /// Fail with the first cycle found, if any
    pub fn ensure_acyclic(&self) -> Result<()> {
        match self.find_cycles().into_iter().next() {
            Some(ids) => Err(Error::Cycle { ids }),
            None => Ok(()),
        }
    }
}

/// Strongly connected components of more than one node, ids sorted
///
/// Components are returned in order of their smallest id.
pub(crate) fn find_cycles<'a>(
    nodes: impl Iterator<Item = &'a str>,
    deps: &'a DependencyMap,
) -> Vec<Vec<ChangeId>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in nodes {
        graph.add_node(node);
    }
    for (source, targets) in deps {
        for target in targets {
            graph.add_edge(source.as_str(), target.as_str(), ());
        }
    }

    let mut cycles: Vec<Vec<ChangeId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut ids: Vec<ChangeId> = component.into_iter().map(str::to_string).collect();
            ids.sort();
            ids
        })
        .collect();
    cycles.sort();
    cycles
}
