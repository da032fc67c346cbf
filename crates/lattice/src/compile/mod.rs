pub(crate) mod registry;
pub(crate) mod resolver;

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};

use async_graphql::Value;

use crate::annotation::{analyze, Position};
use crate::coerce::{coerce_plan, CoercePlan};
use crate::declare::{
    AccessorFn, ClassRef, EnumBinding, InputConstructorFn, ResolverInvoke, ScalarBinding, TypeDeclaration,
};
use crate::error::SchemaError;
use crate::type_spec::{ArgSpec, TypeSpec};

pub(crate) use crate::declare::TypeKind;

use self::resolver::{compile_resolver, FieldPosition};

/// A data field compiled down to its attribute-read accessor.
#[derive(Clone)]
pub(crate) struct CompiledDataField {
    pub name: String,
    pub type_spec: TypeSpec,
    pub description: Option<String>,
    pub deprecation: Option<String>,
    pub has_default: bool,
    pub default_value: Option<Value>,
    pub accessor: AccessorFn,
    pub refs: Vec<ClassRef>,
}

/// A resolver-backed field compiled to its uniform adapter.
#[derive(Clone)]
pub(crate) struct CompiledResolverField {
    pub name: String,
    pub type_spec: TypeSpec,
    pub description: Option<String>,
    pub deprecation: Option<String>,
    pub args: Vec<ArgSpec>,
    pub coercers: Vec<(String, CoercePlan)>,
    pub needs_context: bool,
    pub invoke: ResolverInvoke,
    pub refs: Vec<ClassRef>,
}

#[derive(Clone)]
pub(crate) struct CompiledInputField {
    pub name: String,
    pub type_spec: TypeSpec,
    pub description: Option<String>,
    pub has_default: bool,
    pub default_value: Option<Value>,
    pub plan: CoercePlan,
    pub refs: Vec<ClassRef>,
}

#[derive(Clone)]
pub(crate) enum CompiledField {
    Data(CompiledDataField),
    Resolver(CompiledResolverField),
}

impl CompiledField {
    pub(crate) fn name(&self) -> &str {
        match self {
            CompiledField::Data(field) => &field.name,
            CompiledField::Resolver(field) => &field.name,
        }
    }

    pub(crate) fn type_spec(&self) -> &TypeSpec {
        match self {
            CompiledField::Data(field) => &field.type_spec,
            CompiledField::Resolver(field) => &field.type_spec,
        }
    }
}

pub(crate) struct CompiledEnumValue {
    pub name: String,
}

/// The frozen per-class schema artifact. One per class for the process
/// lifetime; shared by reference across every schema that uses the class.
pub(crate) struct CompiledType {
    pub kind: TypeKind,
    pub name: String,
    pub description: Option<String>,
    pub object_fields: Vec<CompiledField>,
    pub input_fields: Vec<CompiledInputField>,
    pub subscription_fields: Vec<CompiledResolverField>,
    pub enum_values: Vec<CompiledEnumValue>,
    pub implements: Vec<String>,
    pub implements_refs: Vec<ClassRef>,
    pub refs: Vec<ClassRef>,
    pub upcasts: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pub constructor: Option<InputConstructorFn>,
    pub enum_binding: Option<EnumBinding>,
    pub scalar_binding: Option<ScalarBinding>,
}

impl std::fmt::Debug for CompiledType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledType")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Compiles a declaration into its frozen metadata, validating the
/// kind-specific invariants along the way.
pub(crate) fn compile_declaration(
    declaration: TypeDeclaration,
    identity: Option<(TypeId, Box<dyn Any + Send + Sync>)>,
) -> Result<CompiledType, SchemaError> {
    let TypeDeclaration {
        kind,
        name,
        description,
        data_fields,
        input_fields,
        resolvers,
        implements,
        enum_values,
        enum_binding,
        scalar_binding,
        input_constructor,
    } = declaration;

    if !input_fields.is_empty() && kind != TypeKind::Input {
        return Err(SchemaError::InputFieldOutsideInput { type_name: name });
    }
    match kind {
        TypeKind::Input => {
            if !resolvers.is_empty() {
                return Err(SchemaError::InputResolverNotAllowed { type_name: name });
            }
            if !data_fields.is_empty() {
                return Err(SchemaError::InputDataField { type_name: name });
            }
        }
        TypeKind::Subscription => {
            if !data_fields.is_empty() {
                return Err(SchemaError::SubscriptionDataField { type_name: name });
            }
        }
        _ => {}
    }

    let mut seen_fields = HashSet::new();
    let mut object_fields = Vec::new();
    let mut subscription_fields = Vec::new();
    let mut compiled_inputs = Vec::new();
    let mut refs: Vec<ClassRef> = Vec::new();

    for field in data_fields {
        if field.name.starts_with('_') {
            continue;
        }
        let analyzed =
            analyze(&field.annotation, Position::Output, false).map_err(|err| err.for_field(&name, &field.name))?;
        if analyzed.hidden {
            continue;
        }
        if !seen_fields.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateField {
                type_name: name,
                field: field.name,
            });
        }
        let default_value = field
            .default
            .map(Value::from_json)
            .transpose()
            .map_err(|err| SchemaError::InvalidDefault {
                type_name: name.clone(),
                field: field.name.clone(),
                message: err.to_string(),
            })?;
        refs.extend(analyzed.refs.iter().copied());
        object_fields.push(CompiledField::Data(CompiledDataField {
            name: field.name,
            type_spec: analyzed.type_spec,
            description: analyzed.description,
            deprecation: field.deprecation,
            has_default: default_value.is_some(),
            default_value,
            accessor: field.accessor,
            refs: analyzed.refs,
        }));
    }

    for field in input_fields {
        if field.name.starts_with('_') {
            continue;
        }
        let has_default = field.default.is_some();
        let analyzed = analyze(&field.annotation, Position::Input, has_default)
            .map_err(|err| err.for_field(&name, &field.name))?;
        if analyzed.hidden {
            continue;
        }
        if !seen_fields.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateField {
                type_name: name,
                field: field.name,
            });
        }
        let default_value = field
            .default
            .map(Value::from_json)
            .transpose()
            .map_err(|err| SchemaError::InvalidDefault {
                type_name: name.clone(),
                field: field.name.clone(),
                message: err.to_string(),
            })?;
        refs.extend(analyzed.refs.iter().copied());
        compiled_inputs.push(CompiledInputField {
            name: field.name,
            type_spec: analyzed.type_spec,
            description: analyzed.description,
            has_default,
            default_value,
            plan: coerce_plan(&field.annotation),
            refs: analyzed.refs,
        });
    }

    let position = match kind {
        TypeKind::Subscription => FieldPosition::Subscription,
        _ => FieldPosition::Field,
    };
    for field in resolvers {
        let compiled = compile_resolver(&name, field, position)?;
        if !seen_fields.insert(compiled.name.clone()) {
            return Err(SchemaError::DuplicateField {
                type_name: name,
                field: compiled.name,
            });
        }
        refs.extend(compiled.refs.iter().copied());
        match position {
            FieldPosition::Subscription => subscription_fields.push(compiled),
            FieldPosition::Field => object_fields.push(CompiledField::Resolver(compiled)),
        }
    }

    let mut upcasts: HashMap<TypeId, Box<dyn Any + Send + Sync>> = HashMap::new();
    if let Some((key, upcast)) = identity {
        upcasts.insert(key, upcast);
    }

    let mut implement_names = Vec::new();
    let mut implements_refs = Vec::new();
    for decl in implements {
        let interface = decl.interface.compiled()?;
        if interface.kind != TypeKind::Interface {
            return Err(SchemaError::NotAnInterface {
                type_name: name,
                interface: interface.name.clone(),
            });
        }
        // Interface fields not overridden by name are available to the
        // implementer; the upcast entry makes their accessors dispatch.
        for field in &interface.object_fields {
            if seen_fields.insert(field.name().to_owned()) {
                refs.extend(field_refs(field).iter().copied());
                object_fields.push(field.clone());
            }
        }
        implement_names.push(interface.name.clone());
        implements_refs.push(decl.interface);
        refs.push(decl.interface);
        upcasts.insert(decl.upcast_key, decl.upcast);
    }

    let mut deduped_refs: Vec<ClassRef> = Vec::new();
    let mut seen_refs = HashSet::new();
    for reference in refs {
        if seen_refs.insert(reference.type_id()) {
            deduped_refs.push(reference);
        }
    }

    Ok(CompiledType {
        kind,
        name,
        description,
        object_fields,
        input_fields: compiled_inputs,
        subscription_fields,
        enum_values: enum_values
            .into_iter()
            .map(|value| CompiledEnumValue { name: value.name })
            .collect(),
        implements: implement_names,
        implements_refs,
        refs: deduped_refs,
        upcasts,
        constructor: input_constructor,
        enum_binding,
        scalar_binding,
    })
}

fn field_refs(field: &CompiledField) -> &[ClassRef] {
    match field {
        CompiledField::Data(field) => &field.refs,
        CompiledField::Resolver(field) => &field.refs,
    }
}
