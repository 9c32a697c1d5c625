//! Element model: schema definitions (types and fields) and concrete data
//! (instances)
//!
//! Every element variant is part of the closed [`Element`] union, so code that
//! walks elements matches on it exhaustively.

use crate::builtins;
use crate::path::{IdKind, PathId};
use crate::values::{Value, Values};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared handle to a type definition
pub type TypeRef = Arc<TypeElement>;

/// Mapping of annotation name to the type of its value
pub type AnnotationTypes = BTreeMap<String, TypeRef>;

/// Kind of scalar a primitive type holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    /// Free-form value, not interpreted by the engine
    Unknown,
}

/// A scalar type
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveType {
    pub id: PathId,
    pub primitive: PrimitiveKind,
    pub annotation_types: AnnotationTypes,
    pub annotations: Values,
}

impl PrimitiveType {
    pub fn new(id: PathId, primitive: PrimitiveKind) -> Self {
        Self {
            id,
            primitive,
            annotation_types: AnnotationTypes::new(),
            annotations: Values::new(),
        }
    }
}

/// A structured type owning a set of named fields
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub id: PathId,
    pub fields: BTreeMap<String, Field>,
    pub annotation_types: AnnotationTypes,
    pub annotations: Values,
    /// Settings types describe a single adapter-wide configuration record
    pub is_settings: bool,
}

impl ObjectType {
    pub fn new(id: PathId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
            annotation_types: AnnotationTypes::new(),
            annotations: Values::new(),
            is_settings: false,
        }
    }

    /// Add (or replace) a field, pointing its parent back-reference at this type
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        field_type: TypeRef,
        is_list: bool,
    ) -> &mut Field {
        use std::collections::btree_map::Entry;

        let name = name.into();
        let field = Field::new(self.id.clone(), name.clone(), field_type, is_list);
        match self.fields.entry(name) {
            Entry::Occupied(mut e) => {
                e.insert(field);
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(field),
        }
    }

    /// Builder-style variant of [`ObjectType::add_field`]
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        field_type: TypeRef,
        is_list: bool,
    ) -> Self {
        self.add_field(name, field_type, is_list);
        self
    }

    pub fn with_annotation_type(
        mut self,
        name: impl Into<String>,
        annotation_type: TypeRef,
    ) -> Self {
        self.annotation_types.insert(name.into(), annotation_type);
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

/// Either kind of type, as referenced by fields and annotations
#[derive(Debug, Clone, PartialEq)]
pub enum TypeElement {
    Primitive(PrimitiveType),
    Object(ObjectType),
}

impl TypeElement {
    pub fn id(&self) -> &PathId {
        match self {
            Self::Primitive(p) => &p.id,
            Self::Object(o) => &o.id,
        }
    }

    pub fn annotation_types(&self) -> &AnnotationTypes {
        match self {
            Self::Primitive(p) => &p.annotation_types,
            Self::Object(o) => &o.annotation_types,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(o) => Some(o),
            Self::Primitive(_) => None,
        }
    }
}

impl From<ObjectType> for TypeElement {
    fn from(value: ObjectType) -> Self {
        Self::Object(value)
    }
}

impl From<PrimitiveType> for TypeElement {
    fn from(value: PrimitiveType) -> Self {
        Self::Primitive(value)
    }
}

/// A named, typed slot of an [`ObjectType`]
///
/// The owning type is referenced by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub parent_id: PathId,
    pub name: String,
    pub field_type: TypeRef,
    pub annotations: Values,
    /// Values of this field are wrapped in a sequence
    pub is_list: bool,
}

impl Field {
    pub fn new(
        parent_id: PathId,
        name: impl Into<String>,
        field_type: TypeRef,
        is_list: bool,
    ) -> Self {
        Self {
            parent_id,
            name: name.into(),
            field_type,
            annotations: Values::new(),
            is_list,
        }
    }

    pub fn id(&self) -> PathId {
        self.parent_id.child(IdKind::Field, self.name.clone())
    }

    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }
}

/// A concrete data record of some object type
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: PathId,
    pub object_type: Arc<ObjectType>,
    pub values: Values,
    /// Hint for where the record is stored, as path components
    pub path: Option<Vec<String>>,
    /// Values of the built-in instance annotations
    pub annotations: Values,
}

impl Instance {
    pub fn new(name: impl Into<String>, object_type: Arc<ObjectType>, values: Values) -> Self {
        let id = PathId::instance_id(
            object_type.id.adapter(),
            object_type.id.name(),
            name,
        );
        Self {
            id,
            object_type,
            values,
            path: None,
            annotations: Values::new(),
        }
    }

    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }

    /// Annotation schema shared by every instance
    pub fn annotation_types() -> &'static AnnotationTypes {
        builtins::instance_annotation_types()
    }
}

/// Any element of the model
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Object(ObjectType),
    Primitive(PrimitiveType),
    Field(Field),
    Instance(Instance),
}

impl Element {
    pub fn id(&self) -> PathId {
        match self {
            Self::Object(o) => o.id.clone(),
            Self::Primitive(p) => p.id.clone(),
            Self::Field(f) => f.id(),
            Self::Instance(i) => i.id.clone(),
        }
    }

    /// Adapter namespace of the element
    pub fn adapter(&self) -> &str {
        match self {
            Self::Object(o) => o.id.adapter(),
            Self::Primitive(p) => p.id.adapter(),
            Self::Field(f) => f.parent_id.adapter(),
            Self::Instance(i) => i.id.adapter(),
        }
    }

    pub fn annotations(&self) -> &Values {
        match self {
            Self::Object(o) => &o.annotations,
            Self::Primitive(p) => &p.annotations,
            Self::Field(f) => &f.annotations,
            Self::Instance(i) => &i.annotations,
        }
    }

    /// Short name of the variant, for logs and reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "object_type",
            Self::Primitive(_) => "primitive_type",
            Self::Field(_) => "field",
            Self::Instance(_) => "instance",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(i) => Some(i),
            _ => None,
        }
    }
}

impl From<ObjectType> for Element {
    fn from(value: ObjectType) -> Self {
        Self::Object(value)
    }
}

impl From<PrimitiveType> for Element {
    fn from(value: PrimitiveType) -> Self {
        Self::Primitive(value)
    }
}

impl From<Field> for Element {
    fn from(value: Field) -> Self {
        Self::Field(value)
    }
}

impl From<Instance> for Element {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}
