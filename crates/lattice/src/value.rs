use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::FieldValue;
use async_graphql::{Name, Value};
use serde::{Deserialize, Serialize};

use crate::compile::{CompiledType, TypeKind};
use crate::declare::ClassRef;
use crate::error::{ErrorCode, FieldError};
use crate::type_spec::{TypeSpec, SCALAR_BOOLEAN, SCALAR_FLOAT, SCALAR_ID, SCALAR_INT, SCALAR_STRING};
use crate::TypeDefinition;

/// GraphQL `ID` scalar carrier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_owned())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A resolver's return value, in the library's value domain.
///
/// Scalars carry their host representation; objects are opaque handles the
/// engine hands back as the parent of nested resolutions. Only `Vec`-shaped
/// data converts into `List`, which is how non-list carriers are rejected.
#[derive(Debug)]
pub enum Resolved {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Resolved>),
    Object(ObjectValue),
}

impl Resolved {
    /// Wraps an instance of a declared class as an opaque object value.
    pub fn object<T: TypeDefinition>(value: T) -> Resolved {
        Resolved::Object(ObjectValue {
            instance: Arc::new(value),
            class: ClassRef::of::<T>(),
        })
    }

    /// Wraps an already shared instance without another allocation.
    pub fn shared<T: TypeDefinition>(value: Arc<T>) -> Resolved {
        Resolved::Object(ObjectValue {
            instance: value,
            class: ClassRef::of::<T>(),
        })
    }
}

/// An opaque, type-tagged handle to a user value.
#[derive(Clone)]
pub struct ObjectValue {
    pub(crate) instance: Arc<dyn Any + Send + Sync>,
    pub(crate) class: ClassRef,
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValue").field("class", &self.class.name()).finish()
    }
}

impl From<bool> for Resolved {
    fn from(value: bool) -> Self {
        Resolved::Boolean(value)
    }
}

impl From<i64> for Resolved {
    fn from(value: i64) -> Self {
        Resolved::Int(value)
    }
}

impl From<i32> for Resolved {
    fn from(value: i32) -> Self {
        Resolved::Int(value.into())
    }
}

impl From<f64> for Resolved {
    fn from(value: f64) -> Self {
        Resolved::Float(value)
    }
}

impl From<f32> for Resolved {
    fn from(value: f32) -> Self {
        Resolved::Float(value.into())
    }
}

impl From<String> for Resolved {
    fn from(value: String) -> Self {
        Resolved::String(value)
    }
}

impl From<&str> for Resolved {
    fn from(value: &str) -> Self {
        Resolved::String(value.to_owned())
    }
}

impl From<Id> for Resolved {
    fn from(value: Id) -> Self {
        Resolved::String(value.0)
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Resolved::Null,
        }
    }
}

impl<T: Into<Resolved>> From<Vec<T>> for Resolved {
    fn from(value: Vec<T>) -> Self {
        Resolved::List(value.into_iter().map(Into::into).collect())
    }
}

/// The engine-facing payload of a resolved object; nested resolutions
/// downcast it back through the upcast table of its compiled class.
#[derive(Clone)]
pub(crate) struct ParentHandle {
    pub instance: Arc<dyn Any + Send + Sync>,
    pub compiled: Arc<CompiledType>,
}

impl ParentHandle {
    pub(crate) fn type_name(&self) -> &str {
        &self.compiled.name
    }
}

impl ObjectValue {
    pub(crate) fn into_handle(self) -> Result<ParentHandle, FieldError> {
        let compiled = self
            .class
            .compiled()
            .map_err(|err| FieldError::with_code(err.to_string(), ErrorCode::SchemaBuild))?;
        Ok(ParentHandle {
            instance: self.instance,
            compiled,
        })
    }
}

/// Converts a resolver's value into the engine's value domain, guided by the
/// field's `TypeSpec`. Conversion is strict: a scalar position only accepts
/// its own carrier, lists only accept the list carrier, nulls are passed
/// through for the engine's nullability enforcement.
pub(crate) fn to_field_value(
    resolved: Resolved,
    spec: &TypeSpec,
    abstracts: &HashSet<String>,
) -> Result<FieldValue<'static>, FieldError> {
    if let Resolved::Null = resolved {
        return Ok(FieldValue::value(Value::Null));
    }
    match spec {
        TypeSpec::List { element, .. } => match resolved {
            Resolved::List(items) => {
                let mut converted = Vec::with_capacity(items.len());
                for item in items {
                    converted.push(to_field_value(item, element, abstracts)?);
                }
                Ok(FieldValue::list(converted))
            }
            other => Err(FieldError::type_mismatch(format!(
                "expected a list for {}, got {}",
                spec.render(),
                other.kind_name()
            ))),
        },
        TypeSpec::Union { name, members, .. } => match resolved {
            Resolved::Object(object) => {
                let handle = object.into_handle()?;
                let type_name = handle.type_name().to_owned();
                if !members.iter().any(|member| member == &type_name) {
                    return Err(FieldError::with_code(
                        format!("'{type_name}' is not a member of union '{name}'"),
                        ErrorCode::AbstractTypeResolution,
                    ));
                }
                Ok(FieldValue::owned_any(handle).with_type(type_name))
            }
            other => Err(FieldError::type_mismatch(format!(
                "expected an object for union '{name}', got {}",
                other.kind_name()
            ))),
        },
        TypeSpec::Named { name, .. } => match name.as_str() {
            SCALAR_STRING => match resolved {
                Resolved::String(s) => Ok(FieldValue::value(Value::String(s))),
                other => Err(scalar_mismatch(SCALAR_STRING, &other)),
            },
            SCALAR_INT => match resolved {
                Resolved::Int(i) => Ok(FieldValue::value(Value::from(i))),
                other => Err(scalar_mismatch(SCALAR_INT, &other)),
            },
            SCALAR_FLOAT => match resolved {
                Resolved::Float(f) => float_value(f),
                Resolved::Int(i) => float_value(i as f64),
                other => Err(scalar_mismatch(SCALAR_FLOAT, &other)),
            },
            SCALAR_BOOLEAN => match resolved {
                Resolved::Boolean(b) => Ok(FieldValue::value(Value::Boolean(b))),
                other => Err(scalar_mismatch(SCALAR_BOOLEAN, &other)),
            },
            SCALAR_ID => match resolved {
                Resolved::String(s) => Ok(FieldValue::value(Value::String(s))),
                Resolved::Int(i) => Ok(FieldValue::value(Value::String(i.to_string()))),
                other => Err(scalar_mismatch(SCALAR_ID, &other)),
            },
            _ => match resolved {
                Resolved::Object(object) => named_object_value(object, name, abstracts),
                other => Err(FieldError::type_mismatch(format!(
                    "expected an object for '{name}', got {}",
                    other.kind_name()
                ))),
            },
        },
    }
}

fn named_object_value(
    object: ObjectValue,
    name: &str,
    abstracts: &HashSet<String>,
) -> Result<FieldValue<'static>, FieldError> {
    let handle = object.into_handle()?;
    match handle.compiled.kind {
        TypeKind::Enum => {
            let binding = handle.compiled.enum_binding.as_ref().ok_or_else(|| {
                FieldError::type_mismatch(format!("enum '{}' has no host binding", handle.compiled.name))
            })?;
            let value_name = (binding.to_name)(handle.instance.as_ref()).ok_or_else(|| {
                FieldError::type_mismatch(format!("value is not a '{}' enum instance", handle.compiled.name))
            })?;
            if !handle.compiled.enum_values.iter().any(|v| v.name == value_name) {
                return Err(FieldError::type_mismatch(format!(
                    "'{value_name}' is not a declared value of enum '{}'",
                    handle.compiled.name
                )));
            }
            Ok(FieldValue::value(Value::Enum(Name::new(value_name))))
        }
        TypeKind::Scalar => {
            let binding = handle.compiled.scalar_binding.as_ref().ok_or_else(|| {
                FieldError::type_mismatch(format!("scalar '{}' has no host binding", handle.compiled.name))
            })?;
            let value = (binding.serialize)(handle.instance.as_ref())?;
            Ok(FieldValue::value(value))
        }
        TypeKind::Object | TypeKind::Interface => {
            let type_name = handle.type_name().to_owned();
            if type_name != name && !abstracts.contains(name) {
                return Err(FieldError::type_mismatch(format!(
                    "expected '{name}', resolver returned '{type_name}'"
                )));
            }
            Ok(FieldValue::owned_any(handle).with_type(type_name))
        }
        TypeKind::Input | TypeKind::Subscription | TypeKind::Union => Err(FieldError::type_mismatch(format!(
            "'{}' cannot be used as an output value",
            handle.compiled.name
        ))),
    }
}

fn float_value(f: f64) -> Result<FieldValue<'static>, FieldError> {
    serde_json::Number::from_f64(f)
        .map(|n| FieldValue::value(Value::Number(n)))
        .ok_or_else(|| FieldError::type_mismatch("non-finite float cannot be represented"))
}

fn scalar_mismatch(scalar: &str, got: &Resolved) -> FieldError {
    FieldError::type_mismatch(format!("expected {scalar}, got {}", got.kind_name()))
}

impl Resolved {
    fn kind_name(&self) -> &'static str {
        match self {
            Resolved::Null => "null",
            Resolved::Boolean(_) => "a boolean",
            Resolved::Int(_) => "an integer",
            Resolved::Float(_) => "a float",
            Resolved::String(_) => "a string",
            Resolved::List(_) => "a list",
            Resolved::Object(_) => "an object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> TypeSpec {
        TypeSpec::Named {
            name: name.to_owned(),
            nullable: false,
        }
    }

    fn convert(resolved: Resolved, spec: &TypeSpec) -> Result<FieldValue<'static>, FieldError> {
        to_field_value(resolved, spec, &HashSet::new())
    }

    #[test]
    fn string_position_rejects_numbers() {
        let err = convert(Resolved::Int(1), &named("String")).unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn id_accepts_string_and_int() {
        assert!(convert(Resolved::String("a1".into()), &named("ID")).is_ok());
        assert!(convert(Resolved::Int(7), &named("ID")).is_ok());
        assert!(convert(Resolved::Boolean(true), &named("ID")).is_err());
    }

    #[test]
    fn float_accepts_integers() {
        assert!(convert(Resolved::Int(2), &named("Float")).is_ok());
        assert!(convert(Resolved::Float(2.5), &named("Float")).is_ok());
        assert!(convert(Resolved::String("2.5".into()), &named("Float")).is_err());
    }

    #[test]
    fn list_position_requires_list_carrier() {
        let spec = TypeSpec::List {
            element: Box::new(named("Int")),
            nullable: false,
        };
        assert!(convert(Resolved::from(vec![1i64, 2]), &spec).is_ok());
        assert!(convert(Resolved::Int(1), &spec).is_err());
    }

    #[test]
    fn null_passes_through_everywhere() {
        assert!(convert(Resolved::Null, &named("String")).is_ok());
        assert!(convert(Resolved::from(None::<i64>), &named("Int")).is_ok());
    }

    #[test]
    fn option_and_vec_carriers_fold() {
        assert!(matches!(Resolved::from(Some("x")), Resolved::String(_)));
        assert!(matches!(Resolved::from(vec!["a", "b"]), Resolved::List(items) if items.len() == 2));
    }
}
