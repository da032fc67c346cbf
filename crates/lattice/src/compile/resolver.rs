use std::collections::HashSet;

use async_graphql::Value;

use crate::annotation::{analyze, Position};
use crate::coerce::coerce_plan;
use crate::compile::CompiledResolverField;
use crate::declare::{ResolverField, ResolverInvoke};
use crate::error::SchemaError;
use crate::type_spec::ArgSpec;

/// Which field list the resolver compiles into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldPosition {
    Field,
    Subscription,
}

/// Compiles one declared resolver into its immutable runtime record: the
/// analyzed return spec, the argument specs with their coercion plans, and
/// the uniform invoke installed by the declaration.
pub(crate) fn compile_resolver(
    type_name: &str,
    field: ResolverField,
    position: FieldPosition,
) -> Result<CompiledResolverField, SchemaError> {
    let field_name = field.name.clone();
    let in_field = |err: SchemaError| err.for_field(type_name, &field_name);

    match (position, &field.invoke) {
        (FieldPosition::Subscription, ResolverInvoke::Stream(_)) => {}
        (FieldPosition::Subscription, _) => {
            return Err(SchemaError::SubscriptionRequiresStream {
                type_name: type_name.to_owned(),
                field: field_name,
            });
        }
        (FieldPosition::Field, ResolverInvoke::Stream(_)) => {
            return Err(SchemaError::StreamResolverOutsideSubscription {
                type_name: type_name.to_owned(),
                field: field_name,
            });
        }
        (FieldPosition::Field, _) => {}
    }

    let return_position = match position {
        FieldPosition::Field => Position::Output,
        FieldPosition::Subscription => Position::SubscriptionOutput,
    };
    let analyzed_return = analyze(&field.returns, return_position, false).map_err(in_field)?;
    if analyzed_return.hidden {
        return Err(in_field(SchemaError::HiddenNotAllowed));
    }

    let mut refs = analyzed_return.refs;
    let mut args = Vec::with_capacity(field.args.len());
    let mut coercers = Vec::new();
    let mut seen = HashSet::new();
    for argument in field.args {
        if !seen.insert(argument.name.clone()) {
            return Err(SchemaError::DuplicateArgument {
                type_name: type_name.to_owned(),
                field: field_name,
                argument: argument.name,
            });
        }
        let has_default = argument.default.is_some();
        let analyzed = analyze(&argument.annotation, Position::Input, has_default).map_err(in_field)?;
        if analyzed.hidden {
            return Err(in_field(SchemaError::HiddenNotAllowed));
        }
        let default_value = argument
            .default
            .map(Value::from_json)
            .transpose()
            .map_err(|err| SchemaError::InvalidDefault {
                type_name: type_name.to_owned(),
                field: field_name.clone(),
                message: err.to_string(),
            })?;
        refs.extend(analyzed.refs);
        // Every declared argument participates in kwarg assembly; plans that
        // construct nothing stay passthrough.
        coercers.push((argument.name.clone(), coerce_plan(&argument.annotation)));
        args.push(ArgSpec {
            name: argument.name,
            type_spec: analyzed.type_spec,
            description: argument.description.or(analyzed.description),
            has_default,
            default_value,
        });
    }

    Ok(CompiledResolverField {
        name: field.name,
        type_spec: analyzed_return.type_spec,
        description: field.description.or(analyzed_return.description),
        deprecation: field.deprecation,
        args,
        coercers,
        needs_context: field.needs_context,
        invoke: field.invoke,
        refs,
    })
}
