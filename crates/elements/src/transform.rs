//! Schema-driven transformation of values and elements
//!
//! [`transform_values`] walks a values tree guided by the fields of a type and
//! rebuilds it, handing every primitive value and every reference to a
//! caller-supplied callback. [`transform_element`] applies the same walk to
//! each element variant (instance values, annotations, and the fields of
//! object types).
//!
//! Absent results are removed. A mapping or sequence in which nothing
//! survived collapses to absent as well, all the way up the tree.

use crate::element::{
    AnnotationTypes, Element, Field, Instance, ObjectType, PrimitiveType, TypeElement, TypeRef,
};
use crate::path::PathId;
use crate::values::{ReferenceExpression, Value, Values};

/// The schema a values mapping is checked against
#[derive(Debug, Clone, Copy)]
pub enum Schema<'a> {
    /// Fields of an object type
    Object(&'a ObjectType),
    /// Annotation types of an element
    Annotations(&'a AnnotationTypes),
}

impl<'a> Schema<'a> {
    /// Type of the value stored under `key`, and the field declaring it (if any)
    fn lookup(&self, key: &str) -> Option<(&'a TypeRef, Option<&'a Field>)> {
        match *self {
            Self::Object(object) => object.field(key).map(|f| (&f.field_type, Some(f))),
            Self::Annotations(types) => types.get(key).map(|t| (t, None)),
        }
    }
}

impl<'a> From<&'a ObjectType> for Schema<'a> {
    fn from(value: &'a ObjectType) -> Self {
        Self::Object(value)
    }
}

impl<'a> From<&'a AnnotationTypes> for Schema<'a> {
    fn from(value: &'a AnnotationTypes) -> Self {
        Self::Annotations(value)
    }
}

/// Primitive callback that keeps every value as is
pub fn keep_primitive(value: &Value, _path: &PathId, _field: Option<&Field>) -> Option<Value> {
    Some(value.clone())
}

/// Reference callback that keeps every reference as is
pub fn keep_reference(reference: &ReferenceExpression, _path: &PathId) -> Option<Value> {
    Some(Value::Reference(reference.clone()))
}

/// Interceptor that never replaces a value
fn descend(_value: &Value, _path: &PathId) -> Option<Value> {
    None
}

struct Walker<P, R, I> {
    transform_primitive: P,
    transform_reference: R,
    /// Sees every non-reference value before the walk descends into it.
    /// A returned value replaces the whole subtree.
    intercept: I,
    strict: bool,
}

impl<P, R, I> Walker<P, R, I>
where
    P: FnMut(&Value, &PathId, Option<&Field>) -> Option<Value>,
    R: FnMut(&ReferenceExpression, &PathId) -> Option<Value>,
    I: FnMut(&Value, &PathId) -> Option<Value>,
{
    fn values(&mut self, values: &Values, schema: Schema<'_>, path: &PathId) -> Option<Values> {
        let mut transformed = Values::new();
        for (key, value) in values {
            let nested = path.create_nested_id(key.as_str());
            match schema.lookup(key) {
                Some((field_type, field)) => {
                    if let Some(v) = self.value(value, field_type, field, &nested) {
                        transformed.insert(key.clone(), v);
                    }
                }
                None if self.strict => {
                    log::trace!("Dropping value without a schema field: {nested}");
                }
                None => {
                    transformed.insert(key.clone(), value.clone());
                }
            }
        }
        (!transformed.is_empty()).then_some(transformed)
    }

    fn value(
        &mut self,
        value: &Value,
        field_type: &TypeRef,
        field: Option<&Field>,
        path: &PathId,
    ) -> Option<Value> {
        if let Value::Reference(reference) = value {
            return (self.transform_reference)(reference, path);
        }
        if let Some(replacement) = (self.intercept)(value, path) {
            return Some(replacement);
        }
        match value {
            Value::List(items) => {
                let transformed: Vec<Value> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| {
                        let item_path = path.create_nested_id(index.to_string());
                        self.value(item, field_type, field, &item_path)
                    })
                    .collect();
                (!transformed.is_empty()).then_some(Value::List(transformed))
            }
            _ => match field_type.as_ref() {
                TypeElement::Primitive(_) => (self.transform_primitive)(value, path, field),
                TypeElement::Object(object) => match value {
                    Value::Map(values) => self
                        .values(values, Schema::Object(object), path)
                        .map(Value::Map),
                    // Scalar where the schema expects an object
                    other if self.strict => {
                        log::trace!("Dropping {other:?} at {path}: expected an object");
                        None
                    }
                    other => Some(other.clone()),
                },
            },
        }
    }

    fn annotations(
        &mut self,
        annotations: &Values,
        types: &AnnotationTypes,
        path: &PathId,
    ) -> Values {
        self.values(annotations, Schema::Annotations(types), path)
            .unwrap_or_default()
    }

    fn element(&mut self, element: &Element) -> Element {
        match element {
            Element::Instance(instance) => Element::Instance(self.instance(instance)),
            Element::Object(object) => Element::Object(self.object_type(object)),
            Element::Field(field) => Element::Field(self.field(field)),
            Element::Primitive(primitive) => Element::Primitive(self.primitive_type(primitive)),
        }
    }

    fn instance(&mut self, instance: &Instance) -> Instance {
        let values = self
            .values(&instance.values, Schema::Object(&instance.object_type), &instance.id)
            .unwrap_or_default();
        let annotations =
            self.annotations(&instance.annotations, Instance::annotation_types(), &instance.id);
        Instance {
            id: instance.id.clone(),
            object_type: instance.object_type.clone(),
            values,
            path: instance.path.clone(),
            annotations,
        }
    }

    fn object_type(&mut self, object: &ObjectType) -> ObjectType {
        let annotations = self.annotations(
            &object.annotations,
            &object.annotation_types,
            &object.id.attr_root(),
        );
        let fields = object
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), self.field(field)))
            .collect();
        ObjectType {
            id: object.id.clone(),
            fields,
            annotation_types: object.annotation_types.clone(),
            annotations,
            is_settings: object.is_settings,
        }
    }

    fn field(&mut self, field: &Field) -> Field {
        let annotations = self.annotations(
            &field.annotations,
            field.field_type.annotation_types(),
            &field.id(),
        );
        Field {
            parent_id: field.parent_id.clone(),
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            annotations,
            is_list: field.is_list,
        }
    }

    fn primitive_type(&mut self, primitive: &PrimitiveType) -> PrimitiveType {
        let annotations = self.annotations(
            &primitive.annotations,
            &primitive.annotation_types,
            &primitive.id.attr_root(),
        );
        PrimitiveType {
            id: primitive.id.clone(),
            primitive: primitive.primitive,
            annotation_types: primitive.annotation_types.clone(),
            annotations,
        }
    }
}

/// Transform a values tree against `schema`
///
/// * a key without a schema field is dropped when `strict`, and passed
///   through untouched otherwise
/// * a reference goes to `transform_reference` and is not descended into
/// * each item of a sequence is transformed on its own, with the item index
///   appended to the path
/// * a value of a primitive-typed field goes to `transform_primitive`
/// * a value of an object-typed field is transformed recursively
///
/// Returns `None` when nothing survived.
pub fn transform_values<P, R>(
    values: &Values,
    schema: Schema<'_>,
    transform_primitive: P,
    transform_reference: R,
    strict: bool,
    path_id: &PathId,
) -> Option<Values>
where
    P: FnMut(&Value, &PathId, Option<&Field>) -> Option<Value>,
    R: FnMut(&ReferenceExpression, &PathId) -> Option<Value>,
{
    Walker {
        transform_primitive,
        transform_reference,
        intercept: descend,
        strict,
    }
    .values(values, schema, path_id)
}

/// Transform an element into a new element of the same variant
///
/// Instances have their values and annotations transformed; types and fields
/// their annotations. The fields of an object type are transformed as well.
/// Values whose transform came out empty leave an empty mapping behind.
pub fn transform_element<P, R>(
    element: &Element,
    transform_primitive: P,
    transform_reference: R,
    strict: bool,
) -> Element
where
    P: FnMut(&Value, &PathId, Option<&Field>) -> Option<Value>,
    R: FnMut(&ReferenceExpression, &PathId) -> Option<Value>,
{
    transform_element_intercepting(
        element,
        transform_primitive,
        transform_reference,
        descend,
        strict,
    )
}

/// [`transform_element`] with an `intercept` hook
///
/// `intercept` is offered every non-reference value (containers included)
/// before the walk descends into it. When it returns a value, that value
/// replaces the subtree and neither the primitive callback nor the nested
/// values are visited.
pub(crate) fn transform_element_intercepting<P, R, I>(
    element: &Element,
    transform_primitive: P,
    transform_reference: R,
    intercept: I,
    strict: bool,
) -> Element
where
    P: FnMut(&Value, &PathId, Option<&Field>) -> Option<Value>,
    R: FnMut(&ReferenceExpression, &PathId) -> Option<Value>,
    I: FnMut(&Value, &PathId) -> Option<Value>,
{
    Walker {
        transform_primitive,
        transform_reference,
        intercept,
        strict,
    }
    .element(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::BuiltinTypes;
    use crate::element::PrimitiveKind;
    use crate::path::IdKind;
    use serde_json::json;
    use std::sync::Arc;

    fn values(json: serde_json::Value) -> Values {
        match Value::from(json) {
            Value::Map(values) => values,
            other => panic!("expected a map, got {other:?}"),
        }
    }

    fn address_type() -> ObjectType {
        ObjectType::new(PathId::type_id("hub", "address"))
            .with_field("city", BuiltinTypes::string(), false)
            .with_field("zip", BuiltinTypes::string(), false)
    }

    fn contact_type() -> ObjectType {
        ObjectType::new(PathId::type_id("hub", "contact"))
            .with_field("name", BuiltinTypes::string(), false)
            .with_field("emails", BuiltinTypes::string(), true)
            .with_field("address", Arc::new(address_type().into()), false)
            .with_annotation_type("label", BuiltinTypes::string())
    }

    fn only_a() -> ObjectType {
        ObjectType::new(PathId::type_id("hub", "t")).with_field("a", BuiltinTypes::number(), false)
    }

    fn jane_id() -> PathId {
        PathId::instance_id("hub", "contact", "jane")
    }

    fn x_id() -> PathId {
        PathId::instance_id("hub", "t", "x")
    }

    #[test]
    fn test_strict_drops_unknown_fields() {
        let ty = only_a();
        let result = transform_values(
            &values(json!({"a": 1, "b": 2})),
            Schema::Object(&ty),
            keep_primitive,
            keep_reference,
            true,
            &x_id(),
        );
        assert_eq!(result, Some(values(json!({"a": 1}))));
    }

    #[test]
    fn test_non_strict_passes_unknown_fields_through() {
        let ty = only_a();
        let mut visited = Vec::new();
        let result = transform_values(
            &values(json!({"a": 1, "b": 2})),
            Schema::Object(&ty),
            |v: &Value, path: &PathId, _: Option<&Field>| {
                visited.push(path.full_name());
                Some(v.clone())
            },
            keep_reference,
            false,
            &x_id(),
        );
        assert_eq!(result, Some(values(json!({"a": 1, "b": 2}))));
        // Only the schema field reached the primitive callback
        assert_eq!(visited, vec!["hub.t.instance.x.a".to_string()]);
    }

    #[test]
    fn test_all_absent_collapses_to_absent() {
        let ty = contact_type();
        let result = transform_values(
            &values(json!({
                "name": "jane",
                "emails": ["a@x", "b@x"],
                "address": {"city": "Oslo"}
            })),
            Schema::Object(&ty),
            |_: &Value, _: &PathId, _: Option<&Field>| None,
            keep_reference,
            true,
            &jane_id(),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_empty_nested_object_is_removed() {
        let ty = contact_type();
        let result = transform_values(
            &values(json!({"name": "jane", "address": {"city": "Oslo"}})),
            Schema::Object(&ty),
            |v: &Value, path: &PathId, _: Option<&Field>| {
                (path.last_name() != "city").then(|| v.clone())
            },
            keep_reference,
            true,
            &jane_id(),
        );
        assert_eq!(result, Some(values(json!({"name": "jane"}))));
    }

    #[test]
    fn test_sequence_items_get_indexed_paths() {
        let ty = contact_type();
        let mut paths = Vec::new();
        let result = transform_values(
            &values(json!({"emails": ["a@x", "drop", "c@x"]})),
            Schema::Object(&ty),
            |v: &Value, path: &PathId, field: Option<&Field>| {
                paths.push(path.full_name());
                assert_eq!(field.map(|f| f.name.as_str()), Some("emails"));
                (v.as_str() != Some("drop")).then(|| v.clone())
            },
            keep_reference,
            true,
            &jane_id(),
        );
        assert_eq!(result, Some(values(json!({"emails": ["a@x", "c@x"]}))));
        assert_eq!(
            paths,
            vec![
                "hub.contact.instance.jane.emails.0",
                "hub.contact.instance.jane.emails.1",
                "hub.contact.instance.jane.emails.2",
            ]
        );
    }

    #[test]
    fn test_references_skip_primitive_callback() {
        let ty = contact_type();
        let target = PathId::instance_id("hub", "contact", "john").create_nested_id("name");
        let mut input = values(json!({"name": "jane"}));
        input.insert("emails".into(), Value::List(vec![Value::reference(target.clone())]));

        let mut primitive_calls = 0;
        let result = transform_values(
            &input,
            Schema::Object(&ty),
            |v: &Value, _: &PathId, _: Option<&Field>| {
                primitive_calls += 1;
                Some(v.clone())
            },
            |r: &ReferenceExpression, path: &PathId| {
                assert_eq!(path.full_name(), "hub.contact.instance.jane.emails.0");
                Some(Value::from(format!("resolved:{}", r.target.last_name())))
            },
            false,
            &jane_id(),
        );
        assert_eq!(primitive_calls, 1);
        assert_eq!(
            result,
            Some(values(json!({"name": "jane", "emails": ["resolved:name"]})))
        );
    }

    #[test]
    fn test_strict_drops_scalar_in_object_field() {
        let ty = contact_type();
        let input = values(json!({"name": "jane", "address": "somewhere"}));
        let walk = |strict| {
            let schema = Schema::Object(&ty);
            transform_values(&input, schema, keep_primitive, keep_reference, strict, &jane_id())
        };
        let strict = walk(true);
        let lenient = walk(false);
        assert_eq!(strict, Some(values(json!({"name": "jane"}))));
        assert_eq!(lenient, Some(input));
    }

    #[test]
    fn test_transform_instance_element() {
        let ty = Arc::new(contact_type());
        let jane = Instance::new("jane", ty, values(json!({"name": "jane", "legacy": true})))
            .with_annotation("_service_url", "https://hub.example/jane");

        let mut paths = Vec::new();
        let transformed = transform_element(
            &Element::Instance(jane.clone()),
            |v: &Value, path: &PathId, _: Option<&Field>| {
                paths.push(path.full_name());
                Some(v.clone())
            },
            keep_reference,
            true,
        );

        let Element::Instance(result) = transformed else {
            panic!("variant changed");
        };
        assert_eq!(result.id, jane.id);
        assert_eq!(result.values, values(json!({"name": "jane"})));
        assert_eq!(result.annotations, jane.annotations);
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "hub.contact.instance.jane._service_url",
                "hub.contact.instance.jane.name"
            ]
        );
    }

    #[test]
    fn test_transform_object_type_and_fields() {
        let mut ty = contact_type().with_annotation("label", "Contact");
        ty.add_field("name", BuiltinTypes::string(), false);
        let string_with_label = Arc::new(TypeElement::Primitive(PrimitiveType {
            annotation_types: AnnotationTypes::from([(
                "label".to_string(),
                BuiltinTypes::string(),
            )]),
            ..PrimitiveType::new(PathId::type_id("hub", "labeled"), PrimitiveKind::String)
        }));
        ty.add_field("title", string_with_label, false).annotations =
            values(json!({"label": "Title", "unknown": 1}));

        let mut paths = Vec::new();
        let transformed = transform_element(
            &Element::Object(ty.clone()),
            |v: &Value, path: &PathId, _: Option<&Field>| {
                paths.push(path.full_name());
                Some(Value::from(format!("{}!", v.as_str().unwrap_or_default())))
            },
            keep_reference,
            true,
        );

        let Element::Object(result) = transformed else {
            panic!("variant changed");
        };
        assert_eq!(result.annotations, values(json!({"label": "Contact!"})));
        assert_eq!(
            result.field("title").map(|f| f.annotations.clone()),
            Some(values(json!({"label": "Title!"})))
        );
        assert_eq!(result.fields.len(), ty.fields.len());
        paths.sort();
        assert_eq!(
            paths,
            vec!["hub.contact.attr.label", "hub.contact.field.title.label"]
        );
    }

    #[test]
    fn test_transform_field_element() {
        let ty = ObjectType::new(PathId::type_id("hub", "deal"))
            .with_field("amount", BuiltinTypes::number(), false);
        let field = ty.field("amount").cloned().unwrap().with_annotation("anything", 1);

        let element = Element::Field(field.clone());
        let transformed = transform_element(&element, keep_primitive, keep_reference, true);
        let Element::Field(result) = transformed else {
            panic!("variant changed");
        };
        // number declares no annotation types, so strict mode drops the value
        assert!(result.annotations.is_empty());
        assert_eq!(result.id(), PathId::type_id("hub", "deal").child(IdKind::Field, "amount"));
    }

    #[test]
    fn test_intercept_replaces_whole_subtree() {
        let jane = Instance::new(
            "jane",
            Arc::new(contact_type()),
            values(json!({"name": "jane", "emails": ["a@x", "b@x"]})),
        );
        let mut primitive_paths = Vec::new();
        let transformed = transform_element_intercepting(
            &Element::Instance(jane),
            |v: &Value, path: &PathId, _: Option<&Field>| {
                primitive_paths.push(path.full_name());
                Some(v.clone())
            },
            keep_reference,
            |v: &Value, path: &PathId| {
                (path.last_name() == "emails" && matches!(v, Value::List(_)))
                    .then(|| Value::from("collapsed"))
            },
            true,
        );

        let Element::Instance(result) = transformed else {
            panic!("variant changed");
        };
        assert_eq!(result.values, values(json!({"name": "jane", "emails": "collapsed"})));
        assert_eq!(primitive_paths, vec!["hub.contact.instance.jane.name"]);
    }
}
