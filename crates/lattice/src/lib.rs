#![forbid(unsafe_code)]

//! Code-first GraphQL schemas with a native execution engine.
//!
//! Classes declare their GraphQL shape through [`TypeDefinition`]; the
//! declaration is compiled once per process into immutable metadata, a
//! schema is assembled from root classes with [`Schema::builder`], and
//! queries, mutations and subscriptions execute against the engine with a
//! fast path for attribute reads and non-suspending resolvers.

mod annotation;
mod coerce;
mod compile;
mod context;
mod declare;
mod dispatch;
mod error;
mod graph;
mod lookahead;
mod register;
mod request;
mod schema;
mod type_spec;
mod value;

pub use annotation::{Annotation, Shape};
pub use coerce::ArgumentValues;
pub use context::Context;
pub use declare::{
    Argument, ClassRef, DataField, InputField, ResolverField, TypeDeclaration, TypeDefinition, TypeKind,
};
pub use error::{ErrorCode, FieldError, SchemaError};
pub use lookahead::Lookahead;
pub use request::ResolverRequest;
pub use schema::{
    ErrorLocation, Executed, OperationResult, PathSegment, Request, ResponseError, Schema, SchemaBuilder,
    SchemaConfig, SubscriptionStream,
};
pub use value::{Id, ObjectValue, Resolved};
