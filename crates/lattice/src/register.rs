use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, InputObject, InputValue, Interface, InterfaceField, Object, Scalar,
    Schema as DynamicSchema, Subscription, SubscriptionField, Union,
};
use async_graphql::Value;

use crate::compile::{CompiledField, CompiledResolverField, CompiledType, TypeKind};
use crate::dispatch;
use crate::error::SchemaError;
use crate::graph::{CompiledUnion, SchemaBundle};
use crate::schema::SchemaConfig;
use crate::type_spec::ArgSpec;

/// Translates a schema bundle into the engine's dynamic builder calls and
/// finalizes the immutable engine schema.
pub(crate) fn register(bundle: &SchemaBundle, config: &SchemaConfig) -> Result<DynamicSchema, SchemaError> {
    let abstracts: Arc<HashSet<String>> = Arc::new(
        bundle
            .types
            .iter()
            .filter(|compiled| compiled.kind == TypeKind::Interface)
            .map(|compiled| compiled.name.clone())
            .chain(bundle.unions.iter().map(|union| union.name.clone()))
            .collect(),
    );

    let mut builder = DynamicSchema::build(
        bundle.query.as_str(),
        bundle.mutation.as_deref(),
        bundle.subscription.as_deref(),
    );
    for compiled in &bundle.types {
        builder = match compiled.kind {
            TypeKind::Object => builder.register(build_object(compiled, &abstracts)),
            TypeKind::Input => builder.register(build_input(compiled)),
            TypeKind::Interface => builder.register(build_interface(compiled)),
            TypeKind::Subscription => builder.register(build_subscription(compiled, &abstracts)),
            TypeKind::Enum => builder.register(build_enum(compiled)),
            TypeKind::Scalar => builder.register(build_scalar(compiled)),
            // Unions never appear in the types list; they ride in the
            // bundle's dedicated union section.
            TypeKind::Union => builder,
        };
    }
    for union in &bundle.unions {
        builder = builder.register(build_union(union));
    }

    if let Some(limit) = config.depth_limit {
        builder = builder.limit_depth(limit);
    }
    if let Some(limit) = config.complexity_limit {
        builder = builder.limit_complexity(limit);
    }
    if !config.introspection_enabled {
        builder = builder.disable_introspection();
    }

    tracing::debug!(query = %bundle.query, types = bundle.types.len(), "finalizing engine schema");
    builder.finish().map_err(|err| SchemaError::Engine(err.to_string()))
}

fn build_object(compiled: &Arc<CompiledType>, abstracts: &Arc<HashSet<String>>) -> Object {
    let mut object = Object::new(compiled.name.clone());
    if let Some(description) = &compiled.description {
        object = object.description(description.clone());
    }
    for interface in &compiled.implements {
        object = object.implement(interface.clone());
    }
    for field in &compiled.object_fields {
        object = object.field(build_field(field, abstracts));
    }
    object
}

fn build_field(field: &CompiledField, abstracts: &Arc<HashSet<String>>) -> Field {
    match field {
        CompiledField::Data(data) => {
            let shared = Arc::new(data.clone());
            let abstracts = abstracts.clone();
            let mut engine_field = Field::new(data.name.clone(), data.type_spec.to_type_ref(), move |ctx| {
                dispatch::data_field_future(&ctx, &shared, &abstracts)
            });
            if let Some(description) = &data.description {
                engine_field = engine_field.description(description.clone());
            }
            if let Some(reason) = &data.deprecation {
                engine_field = engine_field.deprecation(Some(reason.as_str()));
            }
            engine_field
        }
        CompiledField::Resolver(resolver) => {
            let shared = Arc::new(resolver.clone());
            let abstracts = abstracts.clone();
            let mut engine_field =
                Field::new(resolver.name.clone(), resolver.type_spec.to_type_ref(), move |ctx| {
                    dispatch::resolver_field_future(ctx, &shared, &abstracts)
                });
            if let Some(description) = &resolver.description {
                engine_field = engine_field.description(description.clone());
            }
            if let Some(reason) = &resolver.deprecation {
                engine_field = engine_field.deprecation(Some(reason.as_str()));
            }
            for arg in &resolver.args {
                engine_field = engine_field.argument(build_input_value(arg));
            }
            engine_field
        }
    }
}

fn build_input_value(arg: &ArgSpec) -> InputValue {
    let mut input = InputValue::new(arg.name.clone(), arg.type_spec.to_type_ref());
    if let Some(description) = &arg.description {
        input = input.description(description.clone());
    }
    if arg.has_default {
        input = input.default_value(arg.default_value.clone().unwrap_or(Value::Null));
    }
    input
}

fn build_input(compiled: &Arc<CompiledType>) -> InputObject {
    let mut input = InputObject::new(compiled.name.clone());
    if let Some(description) = &compiled.description {
        input = input.description(description.clone());
    }
    for field in &compiled.input_fields {
        let mut value = InputValue::new(field.name.clone(), field.type_spec.to_type_ref());
        if let Some(description) = &field.description {
            value = value.description(description.clone());
        }
        if field.has_default {
            value = value.default_value(field.default_value.clone().unwrap_or(Value::Null));
        }
        input = input.field(value);
    }
    input
}

fn build_interface(compiled: &Arc<CompiledType>) -> Interface {
    let mut interface = Interface::new(compiled.name.clone());
    if let Some(description) = &compiled.description {
        interface = interface.description(description.clone());
    }
    for field in &compiled.object_fields {
        let mut engine_field = InterfaceField::new(field.name().to_owned(), field.type_spec().to_type_ref());
        match field {
            CompiledField::Data(data) => {
                if let Some(description) = &data.description {
                    engine_field = engine_field.description(description.clone());
                }
            }
            CompiledField::Resolver(resolver) => {
                if let Some(description) = &resolver.description {
                    engine_field = engine_field.description(description.clone());
                }
                for arg in &resolver.args {
                    engine_field = engine_field.argument(build_input_value(arg));
                }
            }
        }
        interface = interface.field(engine_field);
    }
    interface
}

fn build_subscription(compiled: &Arc<CompiledType>, abstracts: &Arc<HashSet<String>>) -> Subscription {
    let mut subscription = Subscription::new(compiled.name.clone());
    if let Some(description) = &compiled.description {
        subscription = subscription.description(description.clone());
    }
    for field in &compiled.subscription_fields {
        subscription = subscription.field(build_subscription_field(field, abstracts));
    }
    subscription
}

fn build_subscription_field(field: &CompiledResolverField, abstracts: &Arc<HashSet<String>>) -> SubscriptionField {
    let shared = Arc::new(field.clone());
    let abstracts = abstracts.clone();
    let mut engine_field =
        SubscriptionField::new(field.name.clone(), field.type_spec.to_type_ref(), move |ctx| {
            dispatch::subscription_field_future(ctx, shared.clone(), abstracts.clone())
        });
    if let Some(description) = &field.description {
        engine_field = engine_field.description(description.clone());
    }
    if let Some(reason) = &field.deprecation {
        engine_field = engine_field.deprecation(Some(reason.as_str()));
    }
    for arg in &field.args {
        engine_field = engine_field.argument(build_input_value(arg));
    }
    engine_field
}

fn build_enum(compiled: &Arc<CompiledType>) -> Enum {
    let mut output = Enum::new(compiled.name.clone());
    if let Some(description) = &compiled.description {
        output = output.description(description.clone());
    }
    output.items(compiled.enum_values.iter().map(|value| EnumItem::new(value.name.clone())))
}

fn build_scalar(compiled: &Arc<CompiledType>) -> Scalar {
    let mut scalar = Scalar::new(compiled.name.clone());
    if let Some(description) = &compiled.description {
        scalar = scalar.description(description.clone());
    }
    scalar
}

fn build_union(union: &CompiledUnion) -> Union {
    let mut output = Union::new(union.name.clone());
    if let Some(description) = &union.description {
        output = output.description(description.clone());
    }
    for member in &union.members {
        output = output.possible_type(member.clone());
    }
    output
}
