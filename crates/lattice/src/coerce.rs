use std::sync::Arc;

use async_graphql::Value;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::annotation::{Annotation, AnnotationNode};
use crate::compile::TypeKind;
use crate::declare::ClassRef;
use crate::error::{ErrorCode, FieldError};
use crate::value::ObjectValue;
use crate::TypeDefinition;

/// How one argument (or input field) position is prepared for user code.
///
/// `Passthrough` keeps the engine value untouched; `Class` constructs a host
/// instance (input object, enum value or custom scalar) before the resolver
/// runs.
#[derive(Clone)]
pub(crate) enum CoercePlan {
    Passthrough,
    Class(ClassRef),
    List(Box<CoercePlan>),
    Optional(Box<CoercePlan>),
}

pub(crate) fn coerce_plan(annotation: &Annotation) -> CoercePlan {
    match &annotation.node {
        AnnotationNode::Scalar(_) | AnnotationNode::Union(_) | AnnotationNode::Hidden(_) => CoercePlan::Passthrough,
        AnnotationNode::Class(class) => CoercePlan::Class(*class),
        AnnotationNode::Described { inner, .. } | AnnotationNode::Stream(inner) => coerce_plan(inner),
        AnnotationNode::Optional(inner) => match coerce_plan(inner) {
            CoercePlan::Passthrough => CoercePlan::Passthrough,
            plan => CoercePlan::Optional(Box::new(plan)),
        },
        AnnotationNode::List(element) => match coerce_plan(element) {
            CoercePlan::Passthrough => CoercePlan::Passthrough,
            plan => CoercePlan::List(Box::new(plan)),
        },
    }
}

/// One coerced argument value.
#[derive(Clone)]
pub(crate) enum ArgValue {
    Null,
    Value(Value),
    Instance(ObjectValue),
    List(Vec<ArgValue>),
}

/// The keyword mapping handed to resolver adapters and input constructors.
#[derive(Default)]
pub struct ArgumentValues {
    values: IndexMap<String, ArgValue>,
}

impl ArgumentValues {
    pub(crate) fn insert(&mut self, name: String, value: ArgValue) {
        self.values.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Deserializes a plain value argument; absent arguments read as null, so
    /// optional arguments are fetched as `Option<V>`.
    pub fn get<V: DeserializeOwned>(&self, name: &str) -> Result<V, FieldError> {
        let json = match self.values.get(name) {
            None => serde_json::Value::Null,
            Some(value) => arg_value_to_json(name, value)?,
        };
        serde_json::from_value(json)
            .map_err(|err| FieldError::coercion(format!("argument '{name}' has an unexpected shape: {err}")))
    }

    /// Fetches a constructed instance argument: an input object, a bound enum
    /// value or a custom scalar.
    pub fn input<T: TypeDefinition>(&self, name: &str) -> Result<Arc<T>, FieldError> {
        self.input_opt(name)?
            .ok_or_else(|| FieldError::coercion(format!("argument '{name}' is required")))
    }

    pub fn input_opt<T: TypeDefinition>(&self, name: &str) -> Result<Option<Arc<T>>, FieldError> {
        match self.values.get(name) {
            None | Some(ArgValue::Null) => Ok(None),
            Some(ArgValue::Instance(object)) => downcast_instance(name, object).map(Some),
            Some(_) => Err(FieldError::coercion(format!(
                "argument '{name}' is not a constructed input value"
            ))),
        }
    }

    pub fn inputs<T: TypeDefinition>(&self, name: &str) -> Result<Vec<Arc<T>>, FieldError> {
        match self.values.get(name) {
            None | Some(ArgValue::Null) => Ok(Vec::new()),
            Some(ArgValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    ArgValue::Instance(object) => downcast_instance(name, object),
                    _ => Err(FieldError::coercion(format!(
                        "argument '{name}' is not a list of constructed input values"
                    ))),
                })
                .collect(),
            Some(_) => Err(FieldError::coercion(format!("argument '{name}' is not a list"))),
        }
    }
}

fn downcast_instance<T: TypeDefinition>(name: &str, object: &ObjectValue) -> Result<Arc<T>, FieldError> {
    object
        .instance
        .clone()
        .downcast::<T>()
        .map_err(|_| FieldError::coercion(format!("argument '{name}' holds a different input class")))
}

fn arg_value_to_json(name: &str, value: &ArgValue) -> Result<serde_json::Value, FieldError> {
    match value {
        ArgValue::Null => Ok(serde_json::Value::Null),
        ArgValue::Value(value) => value
            .clone()
            .into_json()
            .map_err(|err| FieldError::coercion(format!("argument '{name}': {err}"))),
        ArgValue::List(items) => items
            .iter()
            .map(|item| arg_value_to_json(name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        ArgValue::Instance(_) => Err(FieldError::coercion(format!(
            "argument '{name}' is a constructed input; fetch it with input()"
        ))),
    }
}

/// Applies a coercion plan to one engine value.
pub(crate) fn coerce_argument(plan: &CoercePlan, value: &Value) -> Result<ArgValue, FieldError> {
    if matches!(value, Value::Null) {
        return Ok(ArgValue::Null);
    }
    match plan {
        CoercePlan::Passthrough => Ok(ArgValue::Value(value.clone())),
        CoercePlan::Optional(inner) => coerce_argument(inner, value),
        CoercePlan::List(inner) => match value {
            Value::List(items) => items
                .iter()
                .map(|item| coerce_argument(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::List),
            other => {
                // GraphQL list coercion wraps a single value into a one-item list.
                coerce_argument(inner, other).map(|item| ArgValue::List(vec![item]))
            }
        },
        CoercePlan::Class(class) => coerce_class(class, value),
    }
}

fn coerce_class(class: &ClassRef, value: &Value) -> Result<ArgValue, FieldError> {
    let compiled = class
        .compiled()
        .map_err(|err| FieldError::with_code(err.to_string(), ErrorCode::SchemaBuild))?;
    match compiled.kind {
        TypeKind::Input => {
            let Value::Object(map) = value else {
                return Err(FieldError::coercion(format!(
                    "expected a mapping for input type '{}'",
                    compiled.name
                )));
            };
            let mut values = ArgumentValues::default();
            for field in &compiled.input_fields {
                let coerced = match map.get(field.name.as_str()) {
                    Some(raw) => coerce_argument(&field.plan, raw)?,
                    None => match &field.default_value {
                        Some(default) => coerce_argument(&field.plan, default)?,
                        None => ArgValue::Null,
                    },
                };
                values.insert(field.name.clone(), coerced);
            }
            let constructor = compiled.constructor.as_ref().ok_or_else(|| {
                FieldError::with_code(
                    format!("input type '{}' has no constructor", compiled.name),
                    ErrorCode::SchemaBuild,
                )
            })?;
            let instance = constructor(&values)?;
            Ok(ArgValue::Instance(ObjectValue {
                instance,
                class: *class,
            }))
        }
        TypeKind::Enum => {
            let name = match value {
                Value::Enum(name) => name.as_str(),
                Value::String(name) => name.as_str(),
                _ => {
                    return Err(FieldError::coercion(format!(
                        "expected an enum value for '{}'",
                        compiled.name
                    )))
                }
            };
            let binding = compiled.enum_binding.as_ref().ok_or_else(|| {
                FieldError::with_code(
                    format!("enum '{}' has no host binding", compiled.name),
                    ErrorCode::SchemaBuild,
                )
            })?;
            let instance = (binding.from_name)(name).ok_or_else(|| {
                FieldError::coercion(format!("invalid value '{name}' for enum '{}'", compiled.name))
            })?;
            Ok(ArgValue::Instance(ObjectValue {
                instance,
                class: *class,
            }))
        }
        TypeKind::Scalar => {
            let binding = compiled.scalar_binding.as_ref().ok_or_else(|| {
                FieldError::with_code(
                    format!("scalar '{}' has no host binding", compiled.name),
                    ErrorCode::SchemaBuild,
                )
            })?;
            let instance = (binding.parse)(value)?;
            Ok(ArgValue::Instance(ObjectValue {
                instance,
                class: *class,
            }))
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::Subscription | TypeKind::Union => Err(
            FieldError::coercion(format!("'{}' cannot be used in input positions", compiled.name)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;

    #[test]
    fn plans_collapse_when_nothing_constructs() {
        assert!(matches!(coerce_plan(&Annotation::string()), CoercePlan::Passthrough));
        assert!(matches!(
            coerce_plan(&Annotation::of::<Option<Vec<i64>>>()),
            CoercePlan::Passthrough
        ));
    }

    #[test]
    fn null_coerces_to_null_under_any_plan() {
        let plan = CoercePlan::List(Box::new(CoercePlan::Passthrough));
        assert!(matches!(coerce_argument(&plan, &Value::Null).unwrap(), ArgValue::Null));
    }

    #[test]
    fn single_values_wrap_into_lists() {
        let plan = CoercePlan::List(Box::new(CoercePlan::Passthrough));
        let coerced = coerce_argument(&plan, &Value::from(3i64)).unwrap();
        assert!(matches!(coerced, ArgValue::List(items) if items.len() == 1));
    }

    #[test]
    fn typed_getters_deserialize_plain_values() {
        let mut values = ArgumentValues::default();
        values.insert("n".to_owned(), ArgValue::Value(Value::from(7i64)));
        assert_eq!(values.get::<i64>("n").unwrap(), 7);
        assert_eq!(values.get::<Option<i64>>("n").unwrap(), Some(7));
        assert_eq!(values.get::<Option<i64>>("missing").unwrap(), None);
        assert!(values.get::<i64>("missing").is_err());
    }

    #[test]
    fn instances_are_not_plain_values() {
        let mut values = ArgumentValues::default();
        values.insert("n".to_owned(), ArgValue::Value(Value::from(7i64)));
        assert!(values.input_opt::<ProbeInput>("n").is_err());
    }

    struct ProbeInput;

    impl crate::TypeDefinition for ProbeInput {
        fn declaration() -> crate::TypeDeclaration {
            crate::TypeDeclaration::input("ProbeInput").constructor(|_values| Ok(ProbeInput))
        }
    }
}
