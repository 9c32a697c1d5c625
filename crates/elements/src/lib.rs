//! # Elements
//!
//! The typed element model for configuration-as-code.
//!
//! Adapters describe what a service holds as *elements*: object and
//! primitive types (the schema), fields, and instances (the data). Every
//! element and every value nested inside one is addressable by a
//! [`PathId`].
//!
//! ## Core Concepts
//!
//! - **PathId**: hierarchical address of an element or nested value
//! - **Element**: closed union of `ObjectType`, `PrimitiveType`, `Field`, `Instance`
//! - **Value**: JSON-like data, plus symbolic [`ReferenceExpression`]s
//! - **Transform**: schema-guided rewrite of values and elements
//! - **References**: resolve references to values, and restore them afterwards
//!
//! ## Example
//!
//! ```ignore
//! use elements::{BuiltinTypes, Element, ElementIndex, Instance, ObjectType, PathId, Value};
//! use elements::{resolve_references, restore_references};
//!
//! let user = ObjectType::new(PathId::type_id("hub", "user"))
//!     .with_field("email", BuiltinTypes::string(), false);
//! let deal = ObjectType::new(PathId::type_id("hub", "deal"))
//!     .with_field("owner", BuiltinTypes::string(), false);
//!
//! let jane = Instance::new("jane", user.into(), [("email".into(), "jane@x".into())].into());
//! let owner = Value::reference(jane.id.create_nested_id("email"));
//! let big = Instance::new("big", deal.into(), [("owner".into(), owner)].into());
//! let big = Element::Instance(big);
//!
//! let index = ElementIndex::new([Element::Instance(jane)]);
//! let resolved = resolve_references(&big, |id| index.lookup(id));
//! let restored = restore_references(&big, &resolved, |id| index.lookup(id));
//! assert_eq!(restored, big);
//! ```

pub mod builtins;
pub mod element;
pub mod normalize;
pub mod path;
pub mod references;
pub mod transform;
pub mod values;

// Re-export main types at crate root
pub use builtins::{BuiltinTypes, instance_annotation_types, instance_annotations};
pub use element::{
    AnnotationTypes, Element, Field, Instance, ObjectType, PrimitiveKind, PrimitiveType,
    TypeElement, TypeRef,
};
pub use normalize::{normalize_element, normalize_list_values};
pub use path::{IdKind, PathId};
pub use references::{ElementIndex, resolve_path, resolve_references, restore_references};
pub use transform::{Schema, keep_primitive, keep_reference, transform_element, transform_values};
pub use values::{ReferenceExpression, Value, Values};
