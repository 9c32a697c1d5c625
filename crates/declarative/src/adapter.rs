//! Adapter contract and registry
//!
//! An adapter connects the engine to one service: it discovers what the
//! service holds as elements and applies changes back to it. Adapters are
//! registered under their namespace in an explicit [`AdapterRegistry`] that
//! is handed to the planner and executor.

use crate::dependency::DependencyChanger;
use crate::error::{AdapterError, Error, Result};
use elements::{Element, ObjectType};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Connection to one service
pub trait Adapter: Send + Sync {
    /// Namespace of every element this adapter owns
    fn name(&self) -> &str;

    /// Fetch the current state of the service
    fn discover(&self) -> std::result::Result<Vec<Element>, AdapterError>;

    /// Create a type on the service, returning it as the service stored it
    fn add(&self, after: &ObjectType) -> std::result::Result<ObjectType, AdapterError>;

    /// Delete a type from the service
    fn remove(&self, before: &ObjectType) -> std::result::Result<(), AdapterError>;

    /// Update a type on the service, returning it as the service stored it
    fn update(
        &self,
        before: &ObjectType,
        after: &ObjectType,
    ) -> std::result::Result<ObjectType, AdapterError>;

    /// Shape of the credentials/settings this adapter needs
    fn config_type(&self) -> ObjectType;

    /// Custom ordering rules for this adapter's changes, if any
    fn dependency_changer(&self) -> Option<Arc<dyn DependencyChanger>> {
        None
    }
}

/// Registered adapters, keyed by namespace
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any adapter with the same name
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> &mut Self {
        let name = adapter.name().to_string();
        if self.adapters.insert(name.clone(), adapter).is_some() {
            log::warn!("Adapter '{name}' registered twice, keeping the latest");
        }
        self
    }

    pub fn with(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Adapter>> {
        self.adapters.get(name)
    }

    /// Look up an adapter, failing if it is not registered
    pub fn require(&self, name: &str) -> Result<&Arc<dyn Adapter>> {
        self.get(name).ok_or_else(|| Error::UnknownAdapter {
            name: name.to_string(),
        })
    }

    /// Adapters in name order
    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.adapters.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.adapters.keys()).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory adapter shared by the crate's tests

    use super::*;
    use crate::dependency::DependencyChanger;
    use elements::PathId;
    use std::sync::Mutex;

    /// Records every call and fails on the type names listed in `failing`
    #[derive(Default)]
    pub struct MockAdapter {
        pub name: String,
        pub elements: Vec<Element>,
        pub failing: Vec<String>,
        pub calls: Mutex<Vec<String>>,
        pub changer: Option<Arc<dyn DependencyChanger>>,
    }

    impl MockAdapter {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str, ty: &ObjectType) -> std::result::Result<(), AdapterError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{call} {}", ty.id.full_name()));
            if self.failing.iter().any(|name| name == ty.id.name()) {
                return Err(AdapterError::new(format!("{call} rejected for {}", ty.id)));
            }
            Ok(())
        }
    }

    impl Adapter for MockAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn discover(&self) -> std::result::Result<Vec<Element>, AdapterError> {
            Ok(self.elements.clone())
        }

        fn add(&self, after: &ObjectType) -> std::result::Result<ObjectType, AdapterError> {
            self.record("add", after)?;
            Ok(after.clone())
        }

        fn remove(&self, before: &ObjectType) -> std::result::Result<(), AdapterError> {
            self.record("remove", before)
        }

        fn update(
            &self,
            _before: &ObjectType,
            after: &ObjectType,
        ) -> std::result::Result<ObjectType, AdapterError> {
            self.record("update", after)?;
            Ok(after.clone())
        }

        fn config_type(&self) -> ObjectType {
            ObjectType::new(PathId::type_id(self.name.as_str(), "config"))
        }

        fn dependency_changer(&self) -> Option<Arc<dyn DependencyChanger>> {
            self.changer.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockAdapter;
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = AdapterRegistry::new()
            .with(Arc::new(MockAdapter::new("hub")))
            .with(Arc::new(MockAdapter::new("crm")));

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["crm", "hub"]);
        assert!(registry.get("hub").is_some());
        assert!(matches!(
            registry.require("billing"),
            Err(Error::UnknownAdapter { name }) if name == "billing"
        ));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::new("hub")));
        registry.register(Arc::new(MockAdapter::new("hub")));
        assert_eq!(registry.len(), 1);
    }
}
