//! Discover, plan and apply over a set of adapters

use crate::config::EngineConfig;
use anyhow::Result;
use declarative::{
    AdapterError, AdapterRegistry, ConfirmCallback, ExecuteSummary, Plan, Planner, PlannerConfig,
    ProgressCallback, compute_changes, default_dependencies, execute,
};
use elements::{Element, keep_primitive, keep_reference, normalize_element, transform_element};
use rayon::prelude::*;
use thiserror::Error;

/// Errors raised by the engine itself
#[derive(Debug, Error)]
pub enum EngineError {
    /// An adapter could not report its state
    #[error("discovery failed for adapter '{adapter}': {source}")]
    Discovery {
        adapter: String,
        #[source]
        source: AdapterError,
    },

    #[error(transparent)]
    Plan(#[from] declarative::Error),
}

/// Ties an adapter registry to the engine settings
#[derive(Debug, Clone)]
pub struct Engine {
    registry: AdapterRegistry,
    config: EngineConfig,
}

impl Engine {
    pub fn new(registry: AdapterRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current elements of every adapter, normalized
    ///
    /// Adapters are queried in parallel; elements are returned grouped by
    /// adapter in name order.
    pub fn discover(&self) -> std::result::Result<Vec<Element>, EngineError> {
        let adapters: Vec<_> = self.registry.adapters().collect();
        let discover_all = || {
            adapters
                .par_iter()
                .map(|adapter| {
                    adapter.discover().map_err(|source| EngineError::Discovery {
                        adapter: adapter.name().to_string(),
                        source,
                    })
                })
                .collect::<Vec<_>>()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.planner.jobs.max(1))
            .build()
        {
            Ok(pool) => pool.install(discover_all),
            Err(e) => {
                log::warn!("Failed to create thread pool, discovering on the global pool: {e}");
                discover_all()
            }
        };

        let mut elements = Vec::new();
        for (adapter, result) in adapters.iter().zip(results) {
            let discovered = result?;
            log::info!("Discovered {} elements from '{}'", discovered.len(), adapter.name());
            elements.extend(discovered.into_iter().map(|element| self.normalize(&element)));
        }
        Ok(elements)
    }

    /// Normalize one discovered element
    ///
    /// In strict mode values without a field in their type are dropped.
    /// Single values of list fields are wrapped when `normalize_lists` is set.
    pub fn normalize(&self, element: &Element) -> Element {
        let settings = &self.config.transform;
        let mut element =
            transform_element(element, keep_primitive, keep_reference, settings.strict);
        if settings.normalize_lists {
            normalize_element(&mut element);
        }
        element
    }

    /// Plan the changes that turn `before` into `after`
    pub fn plan(
        &self,
        before: &[Element],
        after: &[Element],
    ) -> std::result::Result<Plan, EngineError> {
        let changes = compute_changes(before, after);
        let deps = default_dependencies(&changes);
        let config = self
            .config
            .planner
            .configure(PlannerConfig::from_registry(&self.registry));
        Ok(Planner::new(config).plan(changes, &deps)?)
    }

    /// Apply a plan through the registered adapters
    pub fn apply<P, C>(
        &self,
        plan: &Plan,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<ExecuteSummary>
    where
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        execute(plan, &self.registry, &self.config.execute_options(), progress, confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{
        Adapter, AutoConfirm, ChangeAction, ChangeMap, DependencyChange, DependencyChanger,
        DependencyMap, NoProgress,
    };
    use elements::{BuiltinTypes, Instance, ObjectType, PathId, Value, Values};
    use std::sync::{Arc, Mutex};

    struct TestAdapter {
        name: String,
        elements: Vec<Element>,
        fail_discovery: bool,
        applied: Mutex<Vec<String>>,
        changer: Option<Arc<dyn DependencyChanger>>,
    }

    impl TestAdapter {
        fn new(name: &str, elements: Vec<Element>) -> Self {
            Self {
                name: name.to_string(),
                elements,
                fail_discovery: false,
                applied: Mutex::new(Vec::new()),
                changer: None,
            }
        }

        fn applied(&self) -> Vec<String> {
            self.applied.lock().unwrap().clone()
        }
    }

    impl Adapter for TestAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn discover(&self) -> std::result::Result<Vec<Element>, AdapterError> {
            if self.fail_discovery {
                let records = ["session expired", "quota exceeded"];
                return Err(AdapterError::from_records(records).unwrap());
            }
            Ok(self.elements.clone())
        }

        fn add(&self, after: &ObjectType) -> std::result::Result<ObjectType, AdapterError> {
            self.applied.lock().unwrap().push(format!("add {}", after.id));
            Ok(after.clone())
        }

        fn remove(&self, before: &ObjectType) -> std::result::Result<(), AdapterError> {
            self.applied.lock().unwrap().push(format!("remove {}", before.id));
            Ok(())
        }

        fn update(
            &self,
            _before: &ObjectType,
            after: &ObjectType,
        ) -> std::result::Result<ObjectType, AdapterError> {
            self.applied.lock().unwrap().push(format!("update {}", after.id));
            Ok(after.clone())
        }

        fn config_type(&self) -> ObjectType {
            ObjectType::new(PathId::type_id(self.name.as_str(), "config"))
                .with_field("username", BuiltinTypes::string(), false)
                .with_field("password", BuiltinTypes::string(), false)
                .with_field("sandbox", BuiltinTypes::boolean(), false)
        }

        fn dependency_changer(&self) -> Option<Arc<dyn DependencyChanger>> {
            self.changer.clone()
        }
    }

    fn contact_type() -> ObjectType {
        ObjectType::new(PathId::type_id("hub", "contact"))
            .with_field("email", BuiltinTypes::string(), false)
            .with_field("tags", BuiltinTypes::string(), true)
    }

    fn jane() -> Element {
        let mut values = Values::new();
        values.insert("email".into(), "jane@x".into());
        values.insert("tags".into(), "vip".into());
        values.insert("legacy_id".into(), Value::from(17));
        Element::Instance(Instance::new("jane", Arc::new(contact_type()), values))
    }

    fn engine_with(adapter: TestAdapter, config: EngineConfig) -> (Engine, Arc<TestAdapter>) {
        let adapter = Arc::new(adapter);
        let registry = AdapterRegistry::new().with(adapter.clone());
        (Engine::new(registry, config), adapter)
    }

    #[test]
    fn test_discover_normalizes_elements() {
        let (engine, _) = engine_with(
            TestAdapter::new("hub", vec![Element::Object(contact_type()), jane()]),
            EngineConfig::default(),
        );
        let elements = engine.discover().unwrap();
        assert_eq!(elements.len(), 2);

        let instance = elements[1].as_instance().unwrap();
        assert_eq!(instance.values.get("legacy_id"), None);
        assert_eq!(
            instance.values.get("tags"),
            Some(&Value::List(vec![Value::from("vip")]))
        );
    }

    #[test]
    fn test_discover_non_strict_keeps_unknown_values() {
        let mut config = EngineConfig::default();
        config.transform.strict = false;
        config.transform.normalize_lists = false;
        let (engine, _) = engine_with(TestAdapter::new("hub", vec![jane()]), config);

        let elements = engine.discover().unwrap();
        let instance = elements[0].as_instance().unwrap();
        assert_eq!(instance.values.get("legacy_id"), Some(&Value::from(17)));
        assert_eq!(instance.values.get("tags"), Some(&Value::from("vip")));
    }

    #[test]
    fn test_discovery_failure_names_adapter() {
        let mut adapter = TestAdapter::new("hub", Vec::new());
        adapter.fail_discovery = true;
        let (engine, _) = engine_with(adapter, EngineConfig::default());

        let err = engine.discover().unwrap_err();
        assert_eq!(
            err.to_string(),
            "discovery failed for adapter 'hub': session expired\nquota exceeded"
        );
    }

    #[test]
    fn test_plan_and_apply() {
        let (engine, adapter) =
            engine_with(TestAdapter::new("hub", Vec::new()), EngineConfig::default());
        let deal = ObjectType::new(PathId::type_id("hub", "deal"));
        let before = vec![Element::Object(contact_type()), Element::Object(deal)];
        let after = vec![Element::Object(
            contact_type().with_field("phone", BuiltinTypes::string(), false),
        )];

        let plan = engine.plan(&before, &after).unwrap();
        assert_eq!(plan.item_ids(), vec!["hub.contact", "hub.deal"]);
        assert_eq!(plan.items()[1].action(), ChangeAction::Remove);

        assert_eq!(plan.items()[0].action(), ChangeAction::Modify);

        let summary = engine.apply(&plan, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(adapter.applied(), vec!["update hub.contact", "remove hub.deal"]);
    }

    #[test]
    fn test_apply_honors_dry_run() {
        let mut config = EngineConfig::default();
        config.apply.dry_run = true;
        let (engine, adapter) = engine_with(TestAdapter::new("hub", Vec::new()), config);

        let plan = engine.plan(&[], &[Element::Object(contact_type())]).unwrap();
        let summary = engine.apply(&plan, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(adapter.applied().is_empty());
    }

    #[test]
    fn test_plan_uses_adapter_changers() {
        let changer =
            |changes: &ChangeMap, _: &DependencyMap| -> anyhow::Result<Vec<DependencyChange>> {
                if changes.contains_key("hub.a") && changes.contains_key("hub.b") {
                    return Ok(vec![DependencyChange::add("hub.a", "hub.b")]);
                }
                Ok(Vec::new())
            };
        let mut adapter = TestAdapter::new("hub", Vec::new());
        adapter.changer = Some(Arc::new(changer));
        let (engine, _) = engine_with(adapter, EngineConfig::default());

        let after = vec![
            Element::Object(ObjectType::new(PathId::type_id("hub", "a"))),
            Element::Object(ObjectType::new(PathId::type_id("hub", "b"))),
        ];
        let plan = engine.plan(&[], &after).unwrap();
        assert_eq!(plan.item_ids(), vec!["hub.b", "hub.a"]);
    }

    #[test]
    fn test_config_type_describes_credentials() {
        let adapter = TestAdapter::new("hub", Vec::new());
        let config_type = adapter.config_type();
        assert!(config_type.field("password").is_some());
        assert_eq!(config_type.fields.len(), 3);
    }
}
