//! Built-in primitive types and the fixed instance annotation schema

use crate::element::{AnnotationTypes, PrimitiveKind, PrimitiveType, TypeElement, TypeRef};
use crate::path::PathId;
use std::sync::{Arc, LazyLock};

/// Adapter namespace reserved for engine-provided elements
pub const BUILTIN_ADAPTER: &str = "";

/// Names of the annotations every instance may carry
pub mod instance_annotations {
    /// Instances this instance is nested under
    pub const PARENT: &str = "_parent";
    /// Extra elements that must exist before this instance
    pub const DEPENDS_ON: &str = "_depends_on";
    /// Link to the record in the service UI
    pub const SERVICE_URL: &str = "_service_url";
}

fn primitive(name: &str, kind: PrimitiveKind) -> TypeRef {
    Arc::new(TypeElement::Primitive(PrimitiveType::new(
        PathId::type_id(BUILTIN_ADAPTER, name),
        kind,
    )))
}

static STRING: LazyLock<TypeRef> = LazyLock::new(|| primitive("string", PrimitiveKind::String));
static NUMBER: LazyLock<TypeRef> = LazyLock::new(|| primitive("number", PrimitiveKind::Number));
static BOOLEAN: LazyLock<TypeRef> = LazyLock::new(|| primitive("boolean", PrimitiveKind::Boolean));
static SERVICE_ID: LazyLock<TypeRef> =
    LazyLock::new(|| primitive("serviceid", PrimitiveKind::String));
static JSON: LazyLock<TypeRef> = LazyLock::new(|| primitive("json", PrimitiveKind::Unknown));

static INSTANCE_ANNOTATION_TYPES: LazyLock<AnnotationTypes> = LazyLock::new(|| {
    AnnotationTypes::from([
        (instance_annotations::PARENT.to_string(), BuiltinTypes::string()),
        (instance_annotations::DEPENDS_ON.to_string(), BuiltinTypes::string()),
        (instance_annotations::SERVICE_URL.to_string(), BuiltinTypes::string()),
    ])
});

/// Accessors for the shared built-in types
pub struct BuiltinTypes;

impl BuiltinTypes {
    pub fn string() -> TypeRef {
        TypeRef::clone(&STRING)
    }

    pub fn number() -> TypeRef {
        TypeRef::clone(&NUMBER)
    }

    pub fn boolean() -> TypeRef {
        TypeRef::clone(&BOOLEAN)
    }

    /// Identifier assigned by the backing service
    pub fn service_id() -> TypeRef {
        TypeRef::clone(&SERVICE_ID)
    }

    pub fn json() -> TypeRef {
        TypeRef::clone(&JSON)
    }
}

/// Annotation schema shared by all instances
pub fn instance_annotation_types() -> &'static AnnotationTypes {
    &INSTANCE_ANNOTATION_TYPES
}
