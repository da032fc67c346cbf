use std::any::TypeId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::compile::{registry, CompiledField, CompiledType, TypeKind};
use crate::declare::ClassRef;
use crate::error::SchemaError;
use crate::type_spec::{is_builtin_scalar, TypeSpec};

/// A union discovered while walking the graph's type specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompiledUnion {
    pub name: String,
    pub members: Vec<String>,
    pub description: Option<String>,
}

/// Everything the engine registration needs, in deterministic discovery
/// order. Ordering stability is a public guarantee: SDL output for a given
/// class graph must not change between constructions.
pub(crate) struct SchemaBundle {
    pub query: String,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
    pub types: Vec<Arc<CompiledType>>,
    pub unions: Vec<CompiledUnion>,
}

pub(crate) fn build_schema_graph(
    query: ClassRef,
    mutation: Option<ClassRef>,
    subscription: Option<ClassRef>,
    extra: &[ClassRef],
) -> Result<SchemaBundle, SchemaError> {
    let query_compiled = root_of_kind(query, TypeKind::Object, "query")?;
    validate_query_root(&query_compiled)?;
    let mutation_compiled = mutation.map(|root| root_of_kind(root, TypeKind::Object, "mutation")).transpose()?;
    let subscription_compiled = subscription
        .map(|root| root_of_kind(root, TypeKind::Subscription, "subscription"))
        .transpose()?;

    let mut queue: VecDeque<ClassRef> = VecDeque::new();
    queue.push_back(query);
    queue.extend(mutation);
    queue.extend(subscription);
    queue.extend(extra.iter().copied());

    let mut visited: HashSet<TypeId> = HashSet::new();
    let mut types: Vec<Arc<CompiledType>> = Vec::new();
    let mut interface_ids: Vec<TypeId> = Vec::new();

    loop {
        while let Some(class) = queue.pop_front() {
            if !visited.insert(class.type_id()) {
                continue;
            }
            let compiled = class.compiled()?;
            if compiled.kind == TypeKind::Interface {
                interface_ids.push(class.type_id());
                queue.extend(registry::implementers_of(class.type_id()));
            }
            queue.extend(compiled.refs.iter().copied());
            types.push(compiled);
        }
        // Classes compiled during the walk may have registered as
        // implementers of interfaces visited earlier; settle to a fixpoint.
        let mut grew = false;
        for interface_id in &interface_ids {
            for implementer in registry::implementers_of(*interface_id) {
                if !visited.contains(&implementer.type_id()) {
                    queue.push_back(implementer);
                    grew = true;
                }
            }
        }
        if !grew {
            break;
        }
    }

    let kinds: HashMap<String, TypeKind> = types
        .iter()
        .map(|compiled| (compiled.name.clone(), compiled.kind))
        .collect();

    let unions = collect_unions(&types)?;
    for union in &unions {
        for member in &union.members {
            if kinds.get(member) != Some(&TypeKind::Object) {
                return Err(SchemaError::UnionMemberNotObject {
                    union_name: union.name.clone(),
                    member: member.clone(),
                });
            }
        }
    }

    validate_positions(&types, &kinds)?;

    tracing::debug!(types = types.len(), unions = unions.len(), "collected schema graph");

    Ok(SchemaBundle {
        query: query_compiled.name.clone(),
        mutation: mutation_compiled.map(|compiled| compiled.name.clone()),
        subscription: subscription_compiled.map(|compiled| compiled.name.clone()),
        types,
        unions,
    })
}

fn root_of_kind(root: ClassRef, kind: TypeKind, role: &'static str) -> Result<Arc<CompiledType>, SchemaError> {
    let compiled = root.compiled()?;
    if compiled.kind != kind {
        return Err(SchemaError::InvalidRoot {
            type_name: compiled.name.clone(),
            role,
        });
    }
    Ok(compiled)
}

// Queries have no parent instance to read attributes from, so every data
// field on the query root must fall back to a declared default.
fn validate_query_root(compiled: &CompiledType) -> Result<(), SchemaError> {
    for field in &compiled.object_fields {
        if let CompiledField::Data(data) = field {
            if !data.has_default {
                return Err(SchemaError::RootFieldWithoutDefault {
                    type_name: compiled.name.clone(),
                    field: data.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn collect_unions(types: &[Arc<CompiledType>]) -> Result<Vec<CompiledUnion>, SchemaError> {
    let mut by_name: IndexMap<String, CompiledUnion> = IndexMap::new();
    for compiled in types {
        for spec in iter_type_specs(compiled) {
            let mut conflict = None;
            spec.for_each(&mut |spec| {
                if let TypeSpec::Union {
                    name,
                    members,
                    description,
                    ..
                } = spec
                {
                    let union = CompiledUnion {
                        name: name.clone(),
                        members: members.clone(),
                        description: description.clone(),
                    };
                    match by_name.get(name) {
                        Some(existing) if *existing != union => conflict = Some(name.clone()),
                        Some(_) => {}
                        None => {
                            by_name.insert(name.clone(), union);
                        }
                    }
                }
            });
            if let Some(name) = conflict {
                return Err(SchemaError::UnionConflict { name });
            }
        }
    }
    Ok(by_name.into_values().collect())
}

fn iter_type_specs(compiled: &CompiledType) -> Vec<&TypeSpec> {
    let mut specs = Vec::new();
    for field in &compiled.object_fields {
        specs.push(field.type_spec());
        if let CompiledField::Resolver(resolver) = field {
            specs.extend(resolver.args.iter().map(|arg| &arg.type_spec));
        }
    }
    for field in &compiled.subscription_fields {
        specs.push(&field.type_spec);
        specs.extend(field.args.iter().map(|arg| &arg.type_spec));
    }
    for field in &compiled.input_fields {
        specs.push(&field.type_spec);
    }
    specs
}

fn validate_positions(types: &[Arc<CompiledType>], kinds: &HashMap<String, TypeKind>) -> Result<(), SchemaError> {
    for compiled in types {
        for field in &compiled.input_fields {
            check_input_position(&field.type_spec, kinds)
                .map_err(|err| err.for_field(&compiled.name, &field.name))?;
        }
        for field in &compiled.object_fields {
            check_output_position(field.type_spec(), kinds)
                .map_err(|err| err.for_field(&compiled.name, field.name()))?;
            if let CompiledField::Resolver(resolver) = field {
                for arg in &resolver.args {
                    check_input_position(&arg.type_spec, kinds)
                        .map_err(|err| err.for_field(&compiled.name, &resolver.name))?;
                }
            }
        }
        for field in &compiled.subscription_fields {
            check_output_position(&field.type_spec, kinds)
                .map_err(|err| err.for_field(&compiled.name, &field.name))?;
            for arg in &field.args {
                check_input_position(&arg.type_spec, kinds)
                    .map_err(|err| err.for_field(&compiled.name, &field.name))?;
            }
        }
    }
    Ok(())
}

fn check_input_position(spec: &TypeSpec, kinds: &HashMap<String, TypeKind>) -> Result<(), SchemaError> {
    let mut has_union = false;
    spec.for_each(&mut |nested| has_union |= matches!(nested, TypeSpec::Union { .. }));
    if has_union {
        return Err(SchemaError::UnionInInput);
    }
    let name = spec.innermost_name();
    if is_builtin_scalar(name) {
        return Ok(());
    }
    match kinds.get(name) {
        Some(TypeKind::Input | TypeKind::Enum | TypeKind::Scalar) | None => Ok(()),
        Some(_) => Err(SchemaError::InputTypeExpected { name: name.to_owned() }),
    }
}

fn check_output_position(spec: &TypeSpec, kinds: &HashMap<String, TypeKind>) -> Result<(), SchemaError> {
    let name = spec.innermost_name();
    if kinds.get(name) == Some(&TypeKind::Input) {
        return Err(SchemaError::OutputTypeExpected { name: name.to_owned() });
    }
    Ok(())
}
