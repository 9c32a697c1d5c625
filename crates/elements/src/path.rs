//! Hierarchical identifiers for elements and the values nested inside them.
//!
//! A [`PathId`] names anything the engine can address: a type, one of its
//! fields, an instance, an annotation value, or a value buried several levels
//! deep inside an instance's data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between components of a canonical full name
const SEPARATOR: char = '.';

/// What kind of element (or element part) a [`PathId`] points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    /// A type definition (object or primitive)
    Type,
    /// A field of an object type
    Field,
    /// A concrete data record
    Instance,
    /// An annotation value of a type
    Attr,
    /// An annotation type declared on a type
    Annotation,
}

impl IdKind {
    /// Lowercase name used in full names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Field => "field",
            Self::Instance => "instance",
            Self::Attr => "attr",
            Self::Annotation => "annotation",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable hierarchical identifier
///
/// Two ids are equal iff adapter, name, kind and every path segment match.
/// Use [`PathId::full_name`] when a stable string key is needed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathId {
    adapter: String,
    name: String,
    kind: IdKind,
    segments: Vec<String>,
}

impl PathId {
    /// Create an id from all of its components
    pub fn new(
        adapter: impl Into<String>,
        name: impl Into<String>,
        kind: IdKind,
        segments: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            adapter: adapter.into(),
            name: name.into(),
            kind,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Id of a top-level type
    pub fn type_id(adapter: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(adapter, name, IdKind::Type, Vec::<String>::new())
    }

    /// Id of a top-level instance of type `type_name`
    pub fn instance_id(
        adapter: impl Into<String>,
        type_name: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self::new(adapter, type_name, IdKind::Instance, [instance.into()])
    }

    /// Adapter namespace this id belongs to
    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    /// Element (type) name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// Path segments below the element name
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last component of the id (the last segment, or the element name)
    pub fn last_name(&self) -> &str {
        self.segments.last().map_or(self.name.as_str(), String::as_str)
    }

    /// Whether this id names a top-level element
    pub fn is_top_level(&self) -> bool {
        match self.kind {
            IdKind::Type => self.segments.is_empty(),
            IdKind::Instance => self.segments.len() == 1,
            _ => false,
        }
    }

    /// Derive a child id by appending one segment
    pub fn create_nested_id(&self, segment: impl Into<String>) -> Self {
        let mut nested = self.clone();
        nested.segments.push(segment.into());
        nested
    }

    /// Id of a sibling part of the same type, e.g. `type_id.child(Field, "name")`
    pub fn child(&self, kind: IdKind, segment: impl Into<String>) -> Self {
        Self::new(
            self.adapter.clone(),
            self.name.clone(),
            kind,
            [segment.into()],
        )
    }

    /// Root id under which the annotation values of a type live
    pub fn attr_root(&self) -> Self {
        Self::new(
            self.adapter.clone(),
            self.name.clone(),
            IdKind::Attr,
            Vec::<String>::new(),
        )
    }

    /// Split into the top-level element id and the path inside it
    ///
    /// Instances keep their first segment (the instance name). Every other
    /// kind resolves to the bare type id, with the kind itself leading the
    /// remaining path.
    pub fn create_top_level_parent_id(&self) -> (PathId, Vec<String>) {
        if self.is_top_level() {
            return (self.clone(), Vec::new());
        }
        match self.kind {
            IdKind::Instance if !self.segments.is_empty() => {
                let parent = Self::new(
                    self.adapter.clone(),
                    self.name.clone(),
                    IdKind::Instance,
                    [self.segments[0].clone()],
                );
                (parent, self.segments[1..].to_vec())
            }
            kind => {
                let mut path = Vec::with_capacity(self.segments.len() + 1);
                path.push(kind.as_str().to_string());
                path.extend(self.segments.iter().cloned());
                (Self::type_id(self.adapter.clone(), self.name.clone()), path)
            }
        }
    }

    /// Whether `other` is strictly nested below this id
    pub fn is_parent_of(&self, other: &PathId) -> bool {
        if self.adapter != other.adapter || self.name != other.name {
            return false;
        }
        if self.kind == IdKind::Type && self.segments.is_empty() {
            return other.kind != IdKind::Instance && other != self;
        }
        self.kind == other.kind
            && other.segments.len() > self.segments.len()
            && other.segments.starts_with(&self.segments)
    }

    /// Canonical string form, stable across runs and injective
    pub fn full_name(&self) -> String {
        let mut parts: Vec<String> = vec![escape(&self.adapter), escape(&self.name)];
        if !(self.kind == IdKind::Type && self.segments.is_empty()) {
            parts.push(self.kind.as_str().to_string());
            parts.extend(self.segments.iter().map(|s| escape(s)));
        }
        parts.join(&SEPARATOR.to_string())
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

fn escape(component: &str) -> String {
    if !component.contains(['\\', SEPARATOR]) {
        return component.to_string();
    }
    let mut escaped = String::with_capacity(component.len() + 2);
    for c in component.chars() {
        if c == '\\' || c == SEPARATOR {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
