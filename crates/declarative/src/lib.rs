//! # Declarative
//!
//! Change planning and execution for element-based configuration.
//!
//! Given the current and desired elements of one or more services, this
//! crate works out what has to change, in which order, and applies it
//! through the adapters that own those services.
//!
//! ## Core Concepts
//!
//! - **Change**: one add/remove/modify of an element
//! - **DependencyGraph**: changes plus "must run after" edges between them
//! - **Adapter**: connection to one service, registered in an [`AdapterRegistry`]
//! - **DependencyChanger**: adapter-supplied edge edits, confined to the adapter's changes
//! - **Planner**: rejects cycles and emits [`PlanItem`]s in dependency order
//! - **Executor**: applies plan items one by one through their adapters
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     compute_changes, default_dependencies, execute, AdapterRegistry, AutoConfirm,
//!     ExecuteOptions, NoProgress, Planner, PlannerConfig,
//! };
//!
//! let registry = AdapterRegistry::new().with(my_adapter);
//! let changes = compute_changes(&current, &desired);
//! let deps = default_dependencies(&changes);
//!
//! let plan = Planner::new(PlannerConfig::from_registry(&registry)).plan(changes, &deps)?;
//! let opts = ExecuteOptions::default();
//! let summary = execute(&plan, &registry, &opts, &mut NoProgress, &mut AutoConfirm)?;
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: told about every plan item as it is applied
//! - [`ConfirmCallback`]: decides whether a plan may be applied
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod adapter;
pub mod change;
pub mod context;
pub mod dependency;
pub mod diff;
pub mod error;
pub mod executor;
pub mod graph;
pub mod planner;
pub mod types;

// Re-export main types at crate root
pub use adapter::{Adapter, AdapterRegistry};
pub use change::{Change, ChangeAction, ChangeId};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use dependency::{
    AdapterDependencyChanger, DependencyChanger, filter_for_adapter,
    get_adapter_dependency_changers,
};
pub use diff::{DiffSummary, compute_changes, default_dependencies, group_by_adapter};
pub use error::{AdapterError, Error, Result};
pub use executor::{execute, execute_simple};
pub use graph::{ChangeMap, DependencyChange, DependencyGraph, DependencyMap};
pub use planner::{Plan, PlanItem, Planner, PlannerConfig, default_group_key};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary};
