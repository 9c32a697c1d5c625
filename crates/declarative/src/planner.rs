//! Planner - orders changes into plan items
//!
//! Planning takes the changes and the dependency edges between them, lets
//! every adapter refine the edges of its own changes, rejects cycles, and
//! groups the changes into [`PlanItem`]s emitted in dependency order.

use crate::adapter::AdapterRegistry;
use crate::change::{Change, ChangeAction, ChangeId};
use crate::dependency::{
    AdapterDependencyChanger, DependencyChanger, get_adapter_dependency_changers,
};
use crate::diff::DiffSummary;
use crate::error::{Error, Result};
use crate::graph::{DependencyChange, DependencyGraph, DependencyMap, find_cycles};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Group key of a change: the full name of its top-level element
///
/// Field changes land in the same item as their type.
pub fn default_group_key(change: &Change) -> String {
    let (parent, _) = change.element_id().create_top_level_parent_id();
    parent.full_name()
}

/// Planner settings
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Adapter-scoped dependency changers, applied in this order
    pub changers: Vec<AdapterDependencyChanger>,
    /// Run changers on a thread pool
    pub parallel_changers: bool,
    /// Threads for parallel changers
    pub jobs: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            changers: Vec::new(),
            parallel_changers: true,
            jobs: 4,
        }
    }
}

impl PlannerConfig {
    /// Config with the dependency changers of every registered adapter
    pub fn from_registry(registry: &AdapterRegistry) -> Self {
        Self {
            changers: get_adapter_dependency_changers(registry),
            ..Self::default()
        }
    }

    pub fn with_parallel_changers(mut self, parallel: bool) -> Self {
        self.parallel_changers = parallel;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// Changes applied together, positioned in dependency order
#[derive(Debug, Clone, PartialEq)]
pub struct PlanItem {
    group_key: String,
    changes: Vec<Change>,
    dependencies: BTreeSet<String>,
}

impl PlanItem {
    /// Key shared by every change of the item
    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    /// Changes in the order they must be applied
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Group keys of the items that must be applied before this one
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// The change on the group's own element, or else the first change
    pub fn representative(&self) -> &Change {
        self.changes
            .iter()
            .find(|change| change.id() == self.group_key)
            .unwrap_or(&self.changes[0])
    }

    pub fn action(&self) -> ChangeAction {
        self.representative().action()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Ordered plan items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    items: Vec<PlanItem>,
}

impl Plan {
    pub fn items(&self) -> &[PlanItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Group keys in evaluation order
    pub fn item_ids(&self) -> Vec<&str> {
        self.items.iter().map(PlanItem::group_key).collect()
    }

    /// Every change of the plan, in application order
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.items.iter().flat_map(|item| item.changes.iter())
    }

    pub fn summary(&self) -> DiffSummary {
        let changes: Vec<Change> = self.changes().cloned().collect();
        DiffSummary::from_changes(&changes)
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanItem;
    type IntoIter = std::slice::Iter<'a, PlanItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Builds plans from changes and dependency edges
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan with [`default_group_key`]
    pub fn plan(&self, changes: Vec<Change>, deps: &DependencyMap) -> Result<Plan> {
        self.plan_with(changes, deps, default_group_key)
    }

    /// Plan, grouping changes by `group_key`
    ///
    /// Fails if the edges, after every changer ran, form a cycle between
    /// changes or between groups.
    pub fn plan_with<F>(
        &self,
        changes: Vec<Change>,
        deps: &DependencyMap,
        group_key: F,
    ) -> Result<Plan>
    where
        F: Fn(&Change) -> String,
    {
        let mut graph = DependencyGraph::new(changes, deps)?;
        if graph.is_empty() {
            return Ok(Plan::default());
        }

        let edits = self.run_changers(&graph)?;
        graph.apply(edits)?;
        graph.ensure_acyclic()?;

        let change_order = stable_order(graph.changes().keys(), graph.dependencies())?;

        let group_of: HashMap<&str, String> = graph
            .changes()
            .iter()
            .map(|(id, change)| (id.as_str(), group_key(change)))
            .collect();

        let mut members: BTreeMap<String, Vec<&ChangeId>> = BTreeMap::new();
        for id in &change_order {
            members.entry(group_of[id.as_str()].clone()).or_default().push(id);
        }

        let mut group_deps = DependencyMap::new();
        for (source, targets) in graph.dependencies() {
            let source_group = &group_of[source.as_str()];
            for target in targets {
                let target_group = &group_of[target.as_str()];
                if source_group != target_group {
                    group_deps
                        .entry(source_group.clone())
                        .or_default()
                        .insert(target_group.clone());
                }
            }
        }

        if let Some(cycle) =
            find_cycles(members.keys().map(String::as_str), &group_deps).into_iter().next()
        {
            let mut ids: Vec<ChangeId> = cycle
                .iter()
                .flat_map(|key| members[key].iter().map(|id| (*id).clone()))
                .collect();
            ids.sort();
            log::debug!("Groups {cycle:?} depend on each other");
            return Err(Error::Cycle { ids });
        }

        let group_order = stable_order(members.keys(), &group_deps)?;
        let items: Vec<PlanItem> = group_order
            .into_iter()
            .map(|key| {
                let changes = members[&key]
                    .iter()
                    .filter_map(|id| graph.get(id))
                    .cloned()
                    .collect();
                let dependencies = group_deps.remove(&key).unwrap_or_default();
                PlanItem {
                    group_key: key,
                    changes,
                    dependencies,
                }
            })
            .collect();

        log::info!("Planned {} changes in {} items", graph.len(), items.len());
        Ok(Plan { items })
    }

    /// Run every changer against the same graph and merge their edits
    ///
    /// Edits are returned in changer order regardless of how the changers
    /// were scheduled.
    fn run_changers(&self, graph: &DependencyGraph) -> Result<Vec<DependencyChange>> {
        let changers = &self.config.changers;
        if changers.is_empty() {
            return Ok(Vec::new());
        }

        let run = |changer: &AdapterDependencyChanger| {
            changer
                .change_dependencies(graph.changes(), graph.dependencies())
                .map_err(|e| Error::Changer {
                    adapter: changer.adapter().to_string(),
                    message: format!("{e:#}"),
                })
        };

        let results: Vec<Result<Vec<DependencyChange>>> =
            if self.config.parallel_changers && changers.len() > 1 {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.jobs.max(1))
                    .build()
                {
                    Ok(pool) => pool.install(|| changers.par_iter().map(run).collect()),
                    Err(e) => {
                        log::warn!(
                            "Failed to create thread pool, running changers sequentially: {e}"
                        );
                        changers.iter().map(run).collect()
                    }
                }
            } else {
                changers.iter().map(run).collect()
            };

        let mut edits = Vec::new();
        for result in results {
            edits.extend(result?);
        }
        Ok(edits)
    }
}

/// Topological order that always picks the smallest ready id
///
/// Ids come out after everything they depend on. Ties are broken by id, so
/// the same input always yields the same order.
fn stable_order<'a>(
    nodes: impl Iterator<Item = &'a String>,
    deps: &DependencyMap,
) -> Result<Vec<String>> {
    let mut remaining: BTreeMap<&str, usize> = nodes.map(|id| (id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for (source, targets) in deps {
        for target in targets {
            if let Some(count) = remaining.get_mut(source.as_str()) {
                *count += 1;
            }
            dependents.entry(target.as_str()).or_default().push(source.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|&(_, count)| *count == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(remaining.len());

    while let Some(id) = ready.pop_first() {
        order.push(id.to_string());
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() < remaining.len() {
        let ids = remaining
            .into_iter()
            .filter(|(id, _)| !order.iter().any(|done| done == id))
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(Error::Cycle { ids });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ChangeMap;
    use elements::{BuiltinTypes, ObjectType, PathId};
    use std::sync::Arc;

    fn add_type(adapter: &str, name: &str) -> Change {
        Change::add(ObjectType::new(PathId::type_id(adapter, name)))
    }

    fn add_field(adapter: &str, name: &str, field: &str) -> Change {
        let ty = ObjectType::new(PathId::type_id(adapter, name)).with_field(
            field,
            BuiltinTypes::string(),
            false,
        );
        Change::add(ty.field(field).cloned().unwrap())
    }

    fn deps(edges: &[(&str, &str)]) -> DependencyMap {
        let mut map = DependencyMap::new();
        for (source, target) in edges {
            map.entry((*source).to_string())
                .or_default()
                .insert((*target).to_string());
        }
        map
    }

    fn planner() -> Planner {
        Planner::new(PlannerConfig::default())
    }

    #[test]
    fn test_empty_plan() {
        let plan = planner().plan(Vec::new(), &DependencyMap::new()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_dependencies_come_first() {
        let changes = vec![add_type("x", "a"), add_type("x", "b"), add_type("x", "c")];
        let plan = planner()
            .plan(changes, &deps(&[("x.a", "x.c"), ("x.c", "x.b")]))
            .unwrap();
        assert_eq!(plan.item_ids(), vec!["x.b", "x.c", "x.a"]);
        assert_eq!(
            plan.items()[2].dependencies(),
            &BTreeSet::from(["x.c".to_string()])
        );
    }

    #[test]
    fn test_independent_items_in_id_order() {
        let changes = vec![add_type("y", "z"), add_type("x", "b"), add_type("x", "a")];
        let plan = planner().plan(changes, &DependencyMap::new()).unwrap();
        assert_eq!(plan.item_ids(), vec!["x.a", "x.b", "y.z"]);
    }

    #[test]
    fn test_fields_grouped_under_their_type() {
        let changes = vec![
            add_field("x", "a", "name"),
            add_type("x", "a"),
            add_field("x", "a", "email"),
        ];
        let plan = planner()
            .plan(
                changes,
                &deps(&[("x.a.field.name", "x.a"), ("x.a.field.email", "x.a")]),
            )
            .unwrap();

        assert_eq!(plan.len(), 1);
        let item = &plan.items()[0];
        assert_eq!(item.representative().id(), "x.a");
        assert_eq!(item.action(), ChangeAction::Add);
        let ids: Vec<String> = item.changes().iter().map(Change::id).collect();
        assert_eq!(ids, vec!["x.a", "x.a.field.email", "x.a.field.name"]);
    }

    #[test]
    fn test_representative_falls_back_to_first_change() {
        let changes = vec![add_field("x", "a", "name"), add_field("x", "a", "email")];
        let plan = planner().plan(changes, &DependencyMap::new()).unwrap();
        assert_eq!(plan.items()[0].representative().id(), "x.a.field.email");
    }

    #[test]
    fn test_cycle_is_rejected() {
        let changes = vec![add_type("x", "a"), add_type("x", "b")];
        let err = planner()
            .plan(changes, &deps(&[("x.a", "x.b"), ("x.b", "x.a")]))
            .unwrap_err();
        match err {
            Error::Cycle { ids } => assert_eq!(ids, vec!["x.a", "x.b"]),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_group_cycle_is_rejected() {
        let changes = vec![add_type("x", "a"), add_field("x", "a", "f"), add_type("x", "b")];
        let err = planner()
            .plan(changes, &deps(&[("x.a.field.f", "x.b"), ("x.b", "x.a")]))
            .unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let build = || {
            let changes = vec![
                add_type("y", "q"),
                add_type("x", "b"),
                add_field("x", "b", "f"),
                add_type("x", "a"),
            ];
            planner()
                .plan(changes, &deps(&[("y.q", "x.b"), ("x.b.field.f", "x.b")]))
                .unwrap()
        };
        let first = build();
        for _ in 0..5 {
            assert_eq!(build(), first);
        }
    }

    #[test]
    fn test_custom_group_key() {
        let changes = vec![add_type("x", "a"), add_type("y", "b")];
        let plan = planner()
            .plan_with(changes, &DependencyMap::new(), |c| c.adapter().to_string())
            .unwrap();
        assert_eq!(plan.item_ids(), vec!["x", "y"]);
    }

    fn reverse_changer(
        adapter: &'static str,
    ) -> impl Fn(&ChangeMap, &DependencyMap) -> anyhow::Result<Vec<DependencyChange>> + Send + Sync
    {
        move |_changes: &ChangeMap, deps: &DependencyMap| {
            let mut edits = Vec::new();
            for (source, targets) in deps {
                assert!(source.starts_with(adapter));
                for target in targets {
                    edits.push(DependencyChange::remove(source.clone(), target.clone()));
                    edits.push(DependencyChange::add(target.clone(), source.clone()));
                }
            }
            Ok(edits)
        }
    }

    #[test]
    fn test_changers_refine_their_partition() {
        for parallel in [true, false] {
            let config = PlannerConfig {
                changers: vec![
                    AdapterDependencyChanger::new("x", Arc::new(reverse_changer("x"))),
                    AdapterDependencyChanger::new("y", Arc::new(reverse_changer("y"))),
                ],
                ..PlannerConfig::default()
            }
            .with_parallel_changers(parallel)
            .with_jobs(2);

            let changes = vec![
                add_type("x", "a"),
                add_type("x", "b"),
                add_type("y", "c"),
                add_type("y", "d"),
            ];
            let plan = Planner::new(config)
                .plan(changes, &deps(&[("x.a", "x.b"), ("y.c", "y.d"), ("y.c", "x.a")]))
                .unwrap();
            // x.b now depends on x.a, y.d on y.c; the cross-adapter edge is kept
            assert_eq!(plan.item_ids(), vec!["x.a", "x.b", "y.c", "y.d"]);
        }
    }

    #[test]
    fn test_changer_failure_names_adapter() {
        let failing = |_: &ChangeMap, _: &DependencyMap| -> anyhow::Result<Vec<DependencyChange>> {
            anyhow::bail!("bad ordering rule")
        };
        let config = PlannerConfig {
            changers: vec![AdapterDependencyChanger::new("x", Arc::new(failing))],
            ..PlannerConfig::default()
        };
        let err = Planner::new(config)
            .plan(vec![add_type("x", "a")], &DependencyMap::new())
            .unwrap_err();
        match err {
            Error::Changer { adapter, message } => {
                assert_eq!(adapter, "x");
                assert_eq!(message, "bad ordering rule");
            }
            other => panic!("expected a changer error, got {other:?}"),
        }
    }

    #[test]
    fn test_changer_cannot_introduce_cycle_silently() {
        let looping = |_: &ChangeMap, _: &DependencyMap| -> anyhow::Result<Vec<DependencyChange>> {
            Ok(vec![DependencyChange::add("x.b", "x.a")])
        };
        let config = PlannerConfig {
            changers: vec![AdapterDependencyChanger::new("x", Arc::new(looping))],
            ..PlannerConfig::default()
        };
        let err = Planner::new(config)
            .plan(
                vec![add_type("x", "a"), add_type("x", "b")],
                &deps(&[("x.a", "x.b")]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
    }

    #[test]
    fn test_plan_summary() {
        let changes = vec![add_type("x", "a"), add_field("x", "a", "f")];
        let plan = planner().plan(changes, &DependencyMap::new()).unwrap();
        assert_eq!(plan.summary().additions, 2);
        assert_eq!(plan.changes().count(), 2);
    }
}
