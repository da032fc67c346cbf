use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use crate::compile::{compile_declaration, CompiledType};
use crate::declare::{ClassRef, TypeDeclaration, TypeKind, UpcastTo};
use crate::error::SchemaError;
use crate::TypeDefinition;

/// Process-global side table of compiled class metadata, written exactly
/// once per class. Also indexes interface implementers, which is how the
/// schema-graph builder discovers them without host reflection.
struct Registry {
    types: HashMap<TypeId, Arc<CompiledType>>,
    implementers: HashMap<TypeId, Vec<ClassRef>>,
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(Registry {
            types: HashMap::new(),
            implementers: HashMap::new(),
        })
    })
}

thread_local! {
    static IN_PROGRESS: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
}

pub(crate) fn compile_class<T: TypeDefinition>() -> Result<Arc<CompiledType>, SchemaError> {
    compile_entry(
        TypeId::of::<T>(),
        ClassRef::of::<T>(),
        T::declaration,
        Some(identity_upcast::<T>()),
    )
}

pub(crate) fn compile_unsized_class<I: TypeDefinition + ?Sized + 'static>() -> Result<Arc<CompiledType>, SchemaError> {
    compile_entry(TypeId::of::<I>(), ClassRef::interface::<I>(), I::declaration, None)
}

fn identity_upcast<T: TypeDefinition>() -> (TypeId, Box<dyn Any + Send + Sync>) {
    (
        TypeId::of::<T>(),
        Box::new(UpcastTo::<T>(Arc::new(|any: &(dyn Any + Send + Sync)| {
            any.downcast_ref::<T>()
        }))),
    )
}

fn compile_entry(
    type_id: TypeId,
    self_ref: ClassRef,
    declare: fn() -> TypeDeclaration,
    identity: Option<(TypeId, Box<dyn Any + Send + Sync>)>,
) -> Result<Arc<CompiledType>, SchemaError> {
    if let Some(existing) = lookup(type_id) {
        return Ok(existing);
    }

    let declaration = declare();
    let entered = IN_PROGRESS.with(|set| set.borrow_mut().insert(type_id));
    if !entered {
        return Err(SchemaError::CyclicInterfaces {
            type_name: declaration.name,
        });
    }
    let compiled = compile_declaration(declaration, identity);
    IN_PROGRESS.with(|set| set.borrow_mut().remove(&type_id));
    let compiled = Arc::new(compiled?);

    let mut guard = registry().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    let entry = guard.types.entry(type_id).or_insert_with(|| compiled.clone()).clone();
    if Arc::ptr_eq(&entry, &compiled) {
        if entry.kind == TypeKind::Object {
            for interface in &entry.implements_refs {
                let implementers = guard.implementers.entry(interface.type_id()).or_default();
                if !implementers.iter().any(|r| r.type_id() == type_id) {
                    implementers.push(self_ref);
                }
            }
        }
        tracing::trace!(type_name = %entry.name, kind = entry.kind.as_str(), "compiled type metadata");
    }
    Ok(entry)
}

pub(crate) fn lookup(type_id: TypeId) -> Option<Arc<CompiledType>> {
    registry()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .types
        .get(&type_id)
        .cloned()
}

pub(crate) fn declared_name(type_id: TypeId) -> Option<String> {
    lookup(type_id).map(|compiled| compiled.name.clone())
}

pub(crate) fn implementers_of(type_id: TypeId) -> Vec<ClassRef> {
    registry()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .implementers
        .get(&type_id)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::declare::DataField;
    use crate::TypeDefinition;

    struct Probe;

    impl TypeDefinition for Probe {
        fn declaration() -> TypeDeclaration {
            TypeDeclaration::object("Probe")
                .data_field(DataField::reader::<Probe, _, _>("x", Annotation::int(), |_| 1i64))
        }
    }

    #[test]
    fn compilation_is_idempotent_by_identity() {
        let first = compile_class::<Probe>().unwrap();
        let second = compile_class::<Probe>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn declared_names_resolve_after_compilation() {
        compile_class::<Probe>().unwrap();
        assert_eq!(declared_name(TypeId::of::<Probe>()).as_deref(), Some("Probe"));
    }
}
