//! Post-discovery normalization passes
//!
//! These run once, right after discovery, before elements are handed to any
//! other component.

use crate::element::{Element, Instance, ObjectType, TypeElement};
use crate::values::{Value, Values};

/// Wrap single values of list fields in a one-element sequence
///
/// Services often return a bare value when a list holds one item. Nested
/// object fields are normalized recursively. Nulls and references are left
/// alone.
pub fn normalize_list_values(instance: &mut Instance) {
    let object_type = instance.object_type.clone();
    wrap_list_values(&mut instance.values, &object_type);
}

/// Apply [`normalize_list_values`] if the element is an instance
pub fn normalize_element(element: &mut Element) {
    if let Element::Instance(instance) = element {
        normalize_list_values(instance);
    }
}

fn wrap_list_values(values: &mut Values, object_type: &ObjectType) {
    for (key, value) in values.iter_mut() {
        let Some(field) = object_type.field(key) else {
            continue;
        };

        if field.is_list && !matches!(value, Value::List(_) | Value::Null | Value::Reference(_)) {
            let single = std::mem::replace(value, Value::Null);
            *value = Value::List(vec![single]);
        }

        if let TypeElement::Object(inner) = field.field_type.as_ref() {
            match value {
                Value::Map(nested) => wrap_list_values(nested, inner),
                Value::List(items) => {
                    for item in items.iter_mut() {
                        if let Value::Map(nested) = item {
                            wrap_list_values(nested, inner);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}
