//! # Elementa
//!
//! Configuration-as-code engine. Adapters report what a service holds as
//! typed elements; the engine normalizes them, plans the ordered changes
//! that reach a desired state, and applies the plan through the adapters.
//!
//! The element model lives in the [`elements`] crate, planning and
//! execution in [`declarative`]. This crate adds engine settings, logger
//! setup, and the [`Engine`] that wires them together.
//!
//! ```ignore
//! use elementa::{Engine, EngineConfig};
//! use declarative::{AdapterRegistry, AutoConfirm, NoProgress};
//!
//! elementa::logging::init(1, false);
//! let engine = Engine::new(AdapterRegistry::new().with(my_adapter), EngineConfig::load()?);
//! let current = engine.discover()?;
//! let plan = engine.plan(&current, &desired)?;
//! let summary = engine.apply(&plan, &mut NoProgress, &mut AutoConfirm)?;
//! ```

pub mod config;
pub mod engine;
pub mod logging;

pub use config::{ApplySettings, EngineConfig, PlannerSettings, TransformSettings};
pub use engine::{Engine, EngineError};

pub use declarative;
pub use elements;
