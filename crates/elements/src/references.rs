//! Reference resolution and restoration
//!
//! [`resolve_references`] replaces every reference with the value it points
//! at. [`restore_references`] takes a resolved (and possibly modified) copy
//! and puts the original references back wherever the resolved value is
//! still what the reference points at.
//!
//! Both take a `lookup` from target id to value. It must be a pure function
//! of its argument: restoring compares its result against the data, so a
//! lookup that answers differently between calls breaks the round trip.

use crate::element::Element;
use crate::path::{IdKind, PathId};
use crate::transform::{
    keep_primitive, keep_reference, transform_element, transform_element_intercepting,
};
use crate::values::{ReferenceExpression, Value};
use std::collections::{BTreeMap, HashMap};

/// Replace every reference in `element` with `lookup(reference.target)`
///
/// Runs non-strict, so nothing else in the element changes. A target the
/// lookup maps to [`Value::Null`] resolves to null.
pub fn resolve_references<L>(element: &Element, lookup: L) -> Element
where
    L: Fn(&PathId) -> Value,
{
    transform_element(
        element,
        keep_primitive,
        |reference: &ReferenceExpression, _path: &PathId| Some(lookup(&reference.target)),
        false,
    )
}

/// Put the references of `source` back into `target`
///
/// A plain value in `target` becomes the reference `source` held at the same
/// path if, and only if, it equals what the reference currently resolves to.
/// A value that no longer matches was changed on purpose and stays literal.
///
/// Containers are checked before they are descended into, so a reference
/// that resolved to a list, a mapping or null is restored as well.
pub fn restore_references<L>(source: &Element, target: &Element, lookup: L) -> Element
where
    L: Fn(&PathId) -> Value,
{
    let mut source_references: HashMap<String, ReferenceExpression> = HashMap::new();
    transform_element(
        source,
        keep_primitive,
        |reference: &ReferenceExpression, path: &PathId| {
            source_references.insert(path.full_name(), reference.clone());
            Some(Value::Reference(reference.clone()))
        },
        false,
    );
    log::debug!(
        "Restoring up to {} references into {}",
        source_references.len(),
        target.id()
    );

    transform_element_intercepting(
        target,
        keep_primitive,
        keep_reference,
        |value: &Value, path: &PathId| {
            source_references
                .get(&path.full_name())
                .filter(|reference| lookup(&reference.target) == *value)
                .map(|reference| Value::Reference(reference.clone()))
        },
        false,
    )
}

/// Read the value addressed by `id` inside a top-level `element`
///
/// An id naming an instance itself resolves to the instance's values.
/// Returns `None` if `id` is not inside `element` or nothing is stored there.
pub fn resolve_path(element: &Element, id: &PathId) -> Option<Value> {
    if let Element::Field(field) = element {
        let field_id = field.id();
        if *id == field_id {
            return None;
        }
        if !field_id.is_parent_of(id) {
            return None;
        }
        let rest = &id.segments()[1..];
        return Value::Map(field.annotations.clone()).get_path(rest).cloned();
    }

    let (parent, path) = id.create_top_level_parent_id();
    if parent != element.id() {
        return None;
    }

    match element {
        Element::Instance(instance) => {
            if path.is_empty() {
                return Some(Value::Map(instance.values.clone()));
            }
            let head = path[0].as_str();
            let values = if instance.values.contains_key(head) {
                &instance.values
            } else {
                &instance.annotations
            };
            values.get(head)?.get_path(&path[1..]).cloned()
        }
        Element::Object(object) => match path.split_first() {
            Some((kind, rest)) if kind == IdKind::Attr.as_str() => {
                let (head, rest) = rest.split_first()?;
                object.annotations.get(head)?.get_path(rest).cloned()
            }
            Some((kind, rest)) if kind == IdKind::Field.as_str() => {
                let (name, rest) = rest.split_first()?;
                let (head, rest) = rest.split_first()?;
                object.field(name)?.annotations.get(head)?.get_path(rest).cloned()
            }
            _ => None,
        },
        Element::Primitive(primitive) => match path.split_first() {
            Some((kind, rest)) if kind == IdKind::Attr.as_str() => {
                let (head, rest) = rest.split_first()?;
                primitive.annotations.get(head)?.get_path(rest).cloned()
            }
            _ => None,
        },
        Element::Field(_) => None,
    }
}

/// Top-level elements keyed by id, used to look up reference targets
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    elements: BTreeMap<PathId, Element>,
}

impl ElementIndex {
    pub fn new(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut index = Self::default();
        for element in elements {
            index.insert(element);
        }
        index
    }

    /// Add an element, replacing any element with the same id
    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.id(), element);
    }

    pub fn get(&self, id: &PathId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Value addressed by `id`, if any element holds it
    pub fn resolve(&self, id: &PathId) -> Option<Value> {
        if let Some(element) = self.elements.get(id) {
            return resolve_path(element, id);
        }
        let (parent, _) = id.create_top_level_parent_id();
        let element = self.elements.get(&parent)?;
        resolve_path(element, id)
    }

    /// Lookup for [`resolve_references`]: unknown targets resolve to null
    pub fn lookup(&self, id: &PathId) -> Value {
        self.resolve(id).unwrap_or(Value::Null)
    }
}
