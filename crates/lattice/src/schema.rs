use std::any::Any;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context as TaskContext, Poll};

use async_graphql::dynamic::Schema as DynamicSchema;
use async_graphql::parser::parse_query;
use async_graphql::parser::types::OperationType;
use async_graphql::{Request as EngineRequest, ServerError, Value, Variables};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::context::RequestState;
use crate::declare::ClassRef;
use crate::error::SchemaError;
use crate::graph::build_schema_graph;
use crate::register;
use crate::TypeDefinition;

/// Engine-level execution limits applied when the schema is finalized.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub depth_limit: Option<usize>,
    pub complexity_limit: Option<usize>,
    pub introspection_enabled: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaConfig {
            depth_limit: None,
            complexity_limit: None,
            introspection_enabled: true,
        }
    }
}

/// Assembles a schema from root classes. Eager: every reachable class is
/// compiled and registered by `finish`, and misuse fails there.
#[derive(Default)]
pub struct SchemaBuilder {
    query: Option<ClassRef>,
    mutation: Option<ClassRef>,
    subscription: Option<ClassRef>,
    extra: Vec<ClassRef>,
    config: SchemaConfig,
}

impl SchemaBuilder {
    pub fn query<Q: TypeDefinition>(mut self) -> Self {
        self.query = Some(ClassRef::of::<Q>());
        self
    }

    pub fn mutation<M: TypeDefinition>(mut self) -> Self {
        self.mutation = Some(ClassRef::of::<M>());
        self
    }

    pub fn subscription<S: TypeDefinition>(mut self) -> Self {
        self.subscription = Some(ClassRef::of::<S>());
        self
    }

    /// Adds a class the graph walk would not reach on its own, most often an
    /// interface implementer no field mentions directly.
    pub fn register<T: TypeDefinition>(mut self) -> Self {
        self.extra.push(ClassRef::of::<T>());
        self
    }

    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn depth_limit(mut self, limit: usize) -> Self {
        self.config.depth_limit = Some(limit);
        self
    }

    pub fn complexity_limit(mut self, limit: usize) -> Self {
        self.config.complexity_limit = Some(limit);
        self
    }

    pub fn disable_introspection(mut self) -> Self {
        self.config.introspection_enabled = false;
        self
    }

    pub fn finish(self) -> Result<Schema, SchemaError> {
        let query = self.query.ok_or(SchemaError::MissingQueryRoot)?;
        let bundle = build_schema_graph(query, self.mutation, self.subscription, &self.extra)?;
        let engine = register::register(&bundle, &self.config)?;
        Ok(Schema {
            engine: Arc::new(engine),
            sdl: OnceLock::new(),
        })
    }
}

/// An immutable, executable schema; cheap to share across requests.
#[derive(Debug)]
pub struct Schema {
    engine: Arc<DynamicSchema>,
    sdl: OnceLock<String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The SDL the engine renders for this schema. Deterministic for a given
    /// class graph; cached after the first call.
    pub fn sdl(&self) -> &str {
        self.sdl.get_or_init(|| self.engine.sdl())
    }

    /// Executes a query, mutation or subscription. The operation kind is
    /// detected from the document; subscriptions yield a stream, everything
    /// else a single result.
    pub async fn execute(&self, request: impl Into<Request>) -> Executed {
        let request = request.into();
        let is_subscription = is_subscription(&request.query);
        let engine_request = match request.into_engine() {
            Ok(request) => request,
            Err(response) => return Executed::Response(response),
        };
        if is_subscription {
            let stream = self.engine.execute_stream(engine_request).boxed();
            Executed::Stream(SubscriptionStream { inner: Some(stream) })
        } else {
            let response = self.engine.execute(engine_request).await;
            Executed::Response(response.into())
        }
    }
}

fn is_subscription(query: &str) -> bool {
    let Ok(document) = parse_query(query) else {
        return false;
    };
    for (_name, operation) in document.operations.iter() {
        if operation.node.ty == OperationType::Subscription {
            return true;
        }
    }
    false
}

/// One operation to execute: the query text, optional JSON variables, and an
/// optional caller-owned state value delivered to context-requesting
/// resolvers.
pub struct Request {
    query: String,
    variables: Option<serde_json::Value>,
    state: Option<Arc<dyn Any + Send + Sync>>,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Request {
            query: query.into(),
            variables: None,
            state: None,
        }
    }

    pub fn variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn state<S: Any + Send + Sync>(mut self, state: S) -> Self {
        self.state = Some(Arc::new(state));
        self
    }

    fn into_engine(self) -> Result<EngineRequest, OperationResult> {
        let mut engine_request = EngineRequest::new(self.query);
        if let Some(variables) = self.variables {
            match Value::from_json(variables) {
                Ok(value) => engine_request = engine_request.variables(Variables::from_value(value)),
                Err(err) => return Err(OperationResult::request_error(format!("invalid variables: {err}"))),
            }
        }
        if let Some(state) = self.state {
            engine_request = engine_request.data(RequestState(state));
        }
        Ok(engine_request)
    }
}

impl From<&str> for Request {
    fn from(query: &str) -> Self {
        Request::new(query)
    }
}

impl From<String> for Request {
    fn from(query: String) -> Self {
        Request::new(query)
    }
}

/// The outcome of `execute`: a single result or a subscription stream.
pub enum Executed {
    Response(OperationResult),
    Stream(SubscriptionStream),
}

impl Executed {
    pub fn into_response(self) -> Option<OperationResult> {
        match self {
            Executed::Response(response) => Some(response),
            Executed::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<SubscriptionStream> {
        match self {
            Executed::Stream(stream) => Some(stream),
            Executed::Response(_) => None,
        }
    }
}

/// A single operation result in the standard GraphQL-over-JSON shape.
#[derive(Debug, Serialize)]
pub struct OperationResult {
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

impl OperationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn request_error(message: String) -> Self {
        OperationResult {
            data: serde_json::Value::Null,
            errors: vec![ResponseError {
                message,
                locations: Vec::new(),
                path: Vec::new(),
                extensions: None,
            }],
            extensions: serde_json::Map::new(),
        }
    }
}

impl From<async_graphql::Response> for OperationResult {
    fn from(response: async_graphql::Response) -> Self {
        let data = response.data.into_json().unwrap_or(serde_json::Value::Null);
        let errors = response.errors.into_iter().map(ResponseError::from).collect();
        let mut extensions = serde_json::Map::new();
        for (key, value) in response.extensions {
            if let Ok(json) = value.into_json() {
                extensions.insert(key.to_string(), json);
            }
        }
        OperationResult {
            data,
            errors,
            extensions,
        }
    }
}

/// One error entry of a response.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<ServerError> for ResponseError {
    fn from(err: ServerError) -> Self {
        let extensions = err
            .extensions
            .and_then(|extensions| serde_json::to_value(extensions).ok())
            .filter(|value| value.as_object().is_none_or(|map| !map.is_empty()));
        ResponseError {
            message: err.message,
            locations: err
                .locations
                .into_iter()
                .map(|pos| ErrorLocation {
                    line: pos.line,
                    column: pos.column,
                })
                .collect(),
            path: err
                .path
                .into_iter()
                .map(|segment| match segment {
                    async_graphql::PathSegment::Field(name) => PathSegment::Field(name),
                    async_graphql::PathSegment::Index(index) => PathSegment::Index(index),
                })
                .collect(),
            extensions,
        }
    }
}

/// An async iterator of operation results produced by a subscription.
///
/// Dropping or closing the stream drops the resolver's underlying stream,
/// releasing whatever it holds; closing is idempotent.
pub struct SubscriptionStream {
    inner: Option<BoxStream<'static, async_graphql::Response>>,
}

impl SubscriptionStream {
    pub fn close(&mut self) {
        self.inner = None;
    }
}

impl Stream for SubscriptionStream {
    type Item = OperationResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().inner.as_mut() {
            Some(stream) => stream.poll_next_unpin(cx).map(|item| item.map(Into::into)),
            None => Poll::Ready(None),
        }
    }
}
