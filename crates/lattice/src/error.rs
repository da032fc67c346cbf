use async_graphql::ErrorExtensions;

/// Error raised while compiling type declarations or assembling a schema.
///
/// These surface during schema construction, before any request is executed,
/// and always identify the offending type, field and rule.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema requires a query root type")]
    MissingQueryRoot,
    #[error("'{type_name}' cannot be used as the {role} root")]
    InvalidRoot { type_name: String, role: &'static str },
    #[error("root type '{type_name}' data field '{field}' must declare a default value or use a resolver")]
    RootFieldWithoutDefault { type_name: String, field: String },
    #[error("union types cannot be used in input positions")]
    UnionInInput,
    #[error("unions require at least one object member")]
    EmptyUnion,
    #[error("union '{name}' is already registered with different members or description")]
    UnionConflict { name: String },
    #[error("union '{union_name}' member '{member}' must be an object type")]
    UnionMemberNotObject { union_name: String, member: String },
    #[error("stream annotations are only valid as subscription return types")]
    StreamOutsideSubscription,
    #[error("hidden markers are only valid on data fields")]
    HiddenNotAllowed,
    #[error("input type '{type_name}' cannot declare resolver fields")]
    InputResolverNotAllowed { type_name: String },
    #[error("input type '{type_name}' cannot declare data fields; use input fields")]
    InputDataField { type_name: String },
    #[error("'{type_name}' is not an input type, it cannot declare input fields")]
    InputFieldOutsideInput { type_name: String },
    #[error("subscription type '{type_name}' cannot declare data fields")]
    SubscriptionDataField { type_name: String },
    #[error("subscription field '{type_name}.{field}' requires a stream resolver")]
    SubscriptionRequiresStream { type_name: String, field: String },
    #[error("field '{type_name}.{field}' cannot use a stream resolver outside a subscription type")]
    StreamResolverOutsideSubscription { type_name: String, field: String },
    #[error("'{type_name}' declares field '{field}' more than once")]
    DuplicateField { type_name: String, field: String },
    #[error("resolver '{type_name}.{field}' declares argument '{argument}' more than once")]
    DuplicateArgument {
        type_name: String,
        field: String,
        argument: String,
    },
    #[error("'{name}' is not usable in input positions")]
    InputTypeExpected { name: String },
    #[error("input type '{name}' cannot be used as output")]
    OutputTypeExpected { name: String },
    #[error("cyclic interface inheritance involving '{type_name}'")]
    CyclicInterfaces { type_name: String },
    #[error("'{type_name}' implements '{interface}' which is not an interface")]
    NotAnInterface { type_name: String, interface: String },
    #[error("invalid default for '{type_name}.{field}': {message}")]
    InvalidDefault {
        type_name: String,
        field: String,
        message: String,
    },
    #[error("in '{type_name}.{field}': {source}")]
    InField {
        type_name: String,
        field: String,
        #[source]
        source: Box<SchemaError>,
    },
    #[error("engine rejected the schema: {0}")]
    Engine(String),
}

impl SchemaError {
    pub(crate) fn for_field(self, type_name: &str, field: &str) -> SchemaError {
        match self {
            err @ SchemaError::InField { .. } => err,
            err => SchemaError::InField {
                type_name: type_name.to_owned(),
                field: field.to_owned(),
                source: Box::new(err),
            },
        }
    }
}

/// Stable error taxonomy attached to every runtime error as the
/// `extensions.code` of the GraphQL error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    SchemaBuild,
    ArgumentCoercion,
    ResolverException,
    StreamTerminated,
    TypeMismatch,
    AbstractTypeResolution,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::SchemaBuild => "schema_build",
            ErrorCode::ArgumentCoercion => "argument_coercion",
            ErrorCode::ResolverException => "resolver_exception",
            ErrorCode::StreamTerminated => "stream_terminated",
            ErrorCode::TypeMismatch => "type_mismatch",
            ErrorCode::AbstractTypeResolution => "abstract_type_resolution",
        }
    }
}

/// Error raised from a resolver or from the runtime field boundary.
///
/// The engine attaches the current path and query locations; nullable
/// positions null out, non-null positions propagate per the GraphQL spec.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct FieldError {
    pub message: String,
    pub code: ErrorCode,
}

impl FieldError {
    /// A resolver-raised error.
    pub fn new(message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            code: ErrorCode::ResolverException,
        }
    }

    pub fn with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        FieldError {
            message: message.into(),
            code,
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Self::with_code(message, ErrorCode::TypeMismatch)
    }

    pub(crate) fn coercion(message: impl Into<String>) -> Self {
        Self::with_code(message, ErrorCode::ArgumentCoercion)
    }
}

pub(crate) fn field_error_to_graphql(err: FieldError) -> async_graphql::Error {
    let code = err.code.as_str();
    async_graphql::Error::new(err.message).extend_with(|_, extensions| extensions.set("code", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_defaults_to_resolver_exception() {
        let err = FieldError::new("boom");
        assert_eq!(err.code, ErrorCode::ResolverException);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn taxonomy_codes_are_stable() {
        for (code, expected) in [
            (ErrorCode::SchemaBuild, "schema_build"),
            (ErrorCode::ArgumentCoercion, "argument_coercion"),
            (ErrorCode::ResolverException, "resolver_exception"),
            (ErrorCode::StreamTerminated, "stream_terminated"),
            (ErrorCode::TypeMismatch, "type_mismatch"),
            (ErrorCode::AbstractTypeResolution, "abstract_type_resolution"),
        ] {
            assert_eq!(code.as_str(), expected);
        }
    }

    #[test]
    fn field_context_wraps_once() {
        let err = SchemaError::UnionInInput.for_field("Query", "shape");
        let err = err.for_field("Other", "other");
        assert_eq!(err.to_string(), "in 'Query.shape': union types cannot be used in input positions");
    }
}
