use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use async_graphql::Value;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{Future, FutureExt, Stream, StreamExt};

use crate::annotation::Annotation;
use crate::coerce::ArgumentValues;
use crate::compile::{registry, CompiledType};
use crate::error::{FieldError, SchemaError};
use crate::request::ResolverRequest;
use crate::value::{ParentHandle, Resolved};

/// A class that participates in a GraphQL schema.
///
/// The declaration is walked exactly once per process, the first time the
/// class is reached; the compiled metadata is stored in a side table keyed by
/// the class's `TypeId` and shared by every schema that references it.
pub trait TypeDefinition: Send + Sync + 'static {
    fn declaration() -> TypeDeclaration;
}

/// A lazy, copyable handle to a declared class.
///
/// Holds only monomorphized function pointers, so cyclic type graphs
/// (`User → Post → User`) never hold a runtime cycle; names and compiled
/// metadata resolve on demand.
#[derive(Clone, Copy)]
pub struct ClassRef {
    type_id: TypeId,
    name: fn() -> String,
    compile: fn() -> Result<Arc<CompiledType>, SchemaError>,
}

impl ClassRef {
    pub fn of<T: TypeDefinition>() -> Self {
        ClassRef {
            type_id: TypeId::of::<T>(),
            name: class_name::<T>,
            compile: registry::compile_class::<T>,
        }
    }

    /// Handle for an interface class, typically a trait object type such as
    /// `dyn Letter`.
    pub fn interface<I: TypeDefinition + ?Sized + 'static>() -> Self {
        ClassRef {
            type_id: TypeId::of::<I>(),
            name: class_name::<I>,
            compile: registry::compile_unsized_class::<I>,
        }
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn name(&self) -> String {
        (self.name)()
    }

    pub(crate) fn compiled(&self) -> Result<Arc<CompiledType>, SchemaError> {
        (self.compile)()
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassRef {}

impl std::hash::Hash for ClassRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.name()).finish()
    }
}

fn class_name<T: TypeDefinition + ?Sized + 'static>() -> String {
    registry::declared_name(TypeId::of::<T>()).unwrap_or_else(|| T::declaration().name)
}

/// The kind of a declared class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Input,
    Interface,
    Subscription,
    Enum,
    Scalar,
    Union,
}

impl TypeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TypeKind::Object => "object",
            TypeKind::Input => "input",
            TypeKind::Interface => "interface",
            TypeKind::Subscription => "subscription",
            TypeKind::Enum => "enum",
            TypeKind::Scalar => "scalar",
            TypeKind::Union => "union",
        }
    }
}

pub(crate) type AccessorFn = Arc<dyn Fn(&ParentHandle) -> Result<Resolved, FieldError> + Send + Sync>;
pub(crate) type SyncResolverFn = Arc<dyn Fn(ResolverRequest) -> Result<Resolved, FieldError> + Send + Sync>;
pub(crate) type FutureResolverFn =
    Arc<dyn Fn(ResolverRequest) -> BoxFuture<'static, Result<Resolved, FieldError>> + Send + Sync>;
pub(crate) type StreamResolverFn = Arc<
    dyn Fn(ResolverRequest) -> Result<BoxStream<'static, Result<Resolved, FieldError>>, FieldError> + Send + Sync,
>;
pub(crate) type InputConstructorFn =
    Arc<dyn Fn(&ArgumentValues) -> Result<Arc<dyn Any + Send + Sync>, FieldError> + Send + Sync>;

/// How a resolver is driven at dispatch time.
#[derive(Clone)]
pub(crate) enum ResolverInvoke {
    Sync(SyncResolverFn),
    Future(FutureResolverFn),
    Stream(StreamResolverFn),
}

/// Type-erased `&parent → &I` coercion registered by `implements`.
pub(crate) struct UpcastTo<I: ?Sized + 'static>(
    pub Arc<dyn for<'a> Fn(&'a (dyn Any + Send + Sync)) -> Option<&'a I> + Send + Sync>,
);

pub(crate) struct ImplementsDecl {
    pub interface: ClassRef,
    pub upcast_key: TypeId,
    pub upcast: Box<dyn Any + Send + Sync>,
}

pub(crate) struct EnumBinding {
    pub to_name: Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<String> + Send + Sync>,
    pub from_name: Arc<dyn Fn(&str) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>,
}

pub(crate) struct ScalarBinding {
    pub serialize: Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<Value, FieldError> + Send + Sync>,
    pub parse: Arc<dyn Fn(&Value) -> Result<Arc<dyn Any + Send + Sync>, FieldError> + Send + Sync>,
}

/// A data field backed by a plain attribute read.
pub struct DataField {
    pub(crate) name: String,
    pub(crate) annotation: Annotation,
    pub(crate) deprecation: Option<String>,
    pub(crate) default: Option<serde_json::Value>,
    pub(crate) accessor: AccessorFn,
}

impl DataField {
    /// Declares a data field read from a concrete parent instance.
    pub fn reader<T, V, F>(name: impl Into<String>, annotation: Annotation, read: F) -> Self
    where
        T: TypeDefinition,
        V: Into<Resolved>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let name = name.into();
        let field_name = name.clone();
        DataField {
            name,
            annotation,
            deprecation: None,
            default: None,
            accessor: Arc::new(move |handle| {
                let parent = handle.downcast::<T>().ok_or_else(|| {
                    FieldError::new(format!("parent of field '{field_name}' has an unexpected type"))
                })?;
                Ok(read(parent).into())
            }),
        }
    }

    /// Declares a data field read through an interface, so implementers
    /// inherit it without re-declaring.
    pub fn interface_reader<I, V, F>(name: impl Into<String>, annotation: Annotation, read: F) -> Self
    where
        I: TypeDefinition + ?Sized + 'static,
        V: Into<Resolved>,
        F: Fn(&I) -> V + Send + Sync + 'static,
    {
        let name = name.into();
        let field_name = name.clone();
        DataField {
            name,
            annotation,
            deprecation: None,
            default: None,
            accessor: Arc::new(move |handle| {
                let parent = handle.as_interface::<I>().ok_or_else(|| {
                    FieldError::new(format!("parent of field '{field_name}' does not implement its interface"))
                })?;
                Ok(read(parent).into())
            }),
        }
    }

    /// Default used when the field is resolved without a parent instance,
    /// which is how query-root data fields produce values.
    pub fn default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation = Some(reason.into());
        self
    }
}

/// A field of an input object.
pub struct InputField {
    pub(crate) name: String,
    pub(crate) annotation: Annotation,
    pub(crate) default: Option<serde_json::Value>,
}

impl InputField {
    pub fn new(name: impl Into<String>, annotation: Annotation) -> Self {
        InputField {
            name: name.into(),
            annotation,
            default: None,
        }
    }

    pub fn default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One declared argument of a resolver field.
pub struct Argument {
    pub(crate) name: String,
    pub(crate) annotation: Annotation,
    pub(crate) description: Option<String>,
    pub(crate) default: Option<serde_json::Value>,
}

impl Argument {
    pub fn new(name: impl Into<String>, annotation: Annotation) -> Self {
        Argument {
            name: name.into(),
            annotation,
            description: None,
            default: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A resolver-backed field.
///
/// Comes in three flavors: synchronous, future and stream. Stream resolvers
/// are only legal on subscription types, and subscription types accept
/// nothing else.
pub struct ResolverField {
    pub(crate) name: String,
    pub(crate) returns: Annotation,
    pub(crate) args: Vec<Argument>,
    pub(crate) needs_context: bool,
    pub(crate) description: Option<String>,
    pub(crate) deprecation: Option<String>,
    pub(crate) invoke: ResolverInvoke,
}

impl ResolverField {
    /// A synchronous resolver; takes the fast dispatch path.
    pub fn new<F>(name: impl Into<String>, returns: Annotation, resolve: F) -> Self
    where
        F: Fn(ResolverRequest) -> Result<Resolved, FieldError> + Send + Sync + 'static,
    {
        Self::with_invoke(name, returns, ResolverInvoke::Sync(Arc::new(resolve)))
    }

    /// An asynchronous resolver. Futures that complete without suspending
    /// are resolved inline, without reaching the engine's future machinery.
    pub fn new_future<F, Fut>(name: impl Into<String>, returns: Annotation, resolve: F) -> Self
    where
        F: Fn(ResolverRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resolved, FieldError>> + Send + 'static,
    {
        Self::with_invoke(
            name,
            returns,
            ResolverInvoke::Future(Arc::new(move |request| resolve(request).boxed())),
        )
    }

    /// A subscription resolver producing a stream of items.
    pub fn new_stream<F, S>(name: impl Into<String>, returns: Annotation, resolve: F) -> Self
    where
        F: Fn(ResolverRequest) -> Result<S, FieldError> + Send + Sync + 'static,
        S: Stream<Item = Result<Resolved, FieldError>> + Send + 'static,
    {
        Self::with_invoke(
            name,
            returns,
            ResolverInvoke::Stream(Arc::new(move |request| resolve(request).map(|stream| stream.boxed()))),
        )
    }

    fn with_invoke(name: impl Into<String>, returns: Annotation, invoke: ResolverInvoke) -> Self {
        ResolverField {
            name: name.into(),
            returns,
            args: Vec::new(),
            needs_context: false,
            description: None,
            deprecation: None,
            invoke,
        }
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.args.push(argument);
        self
    }

    /// Requests the per-request context: the caller-supplied state plus a
    /// lookahead snapshot of the selection set under this field.
    pub fn with_context(mut self) -> Self {
        self.needs_context = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation = Some(reason.into());
        self
    }
}

pub(crate) struct EnumValueDecl {
    pub name: String,
}

/// The declared shape of one class, produced by [`TypeDefinition::declaration`].
pub struct TypeDeclaration {
    pub(crate) kind: TypeKind,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) data_fields: Vec<DataField>,
    pub(crate) input_fields: Vec<InputField>,
    pub(crate) resolvers: Vec<ResolverField>,
    pub(crate) implements: Vec<ImplementsDecl>,
    pub(crate) enum_values: Vec<EnumValueDecl>,
    pub(crate) enum_binding: Option<EnumBinding>,
    pub(crate) scalar_binding: Option<ScalarBinding>,
    pub(crate) input_constructor: Option<InputConstructorFn>,
}

impl TypeDeclaration {
    fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        TypeDeclaration {
            kind,
            name: name.into(),
            description: None,
            data_fields: Vec::new(),
            input_fields: Vec::new(),
            resolvers: Vec::new(),
            implements: Vec::new(),
            enum_values: Vec::new(),
            enum_binding: None,
            scalar_binding: None,
            input_constructor: None,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Object, name)
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Input, name)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Interface, name)
    }

    pub fn subscription(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Subscription, name)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Enum, name)
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Scalar, name)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn data_field(mut self, field: DataField) -> Self {
        self.data_fields.push(field);
        self
    }

    pub fn input_field(mut self, field: InputField) -> Self {
        self.input_fields.push(field);
        self
    }

    pub fn resolver(mut self, field: ResolverField) -> Self {
        self.resolvers.push(field);
        self
    }

    /// Declares an enum value; only meaningful on enumeration declarations.
    pub fn value(mut self, name: impl Into<String>) -> Self {
        self.enum_values.push(EnumValueDecl { name: name.into() });
        self
    }

    /// Declares that this object implements the interface `I`, providing the
    /// parent coercion used by inherited fields and by
    /// `ResolverRequest::parent_interface`.
    pub fn implements<I, T, F>(mut self, upcast: F) -> Self
    where
        I: TypeDefinition + ?Sized + 'static,
        T: TypeDefinition,
        F: for<'a> Fn(&'a T) -> &'a I + Send + Sync + 'static,
    {
        self.implements.push(ImplementsDecl {
            interface: ClassRef::interface::<I>(),
            upcast_key: TypeId::of::<I>(),
            upcast: Box::new(UpcastTo::<I>(Arc::new(move |any: &(dyn Any + Send + Sync)| {
                any.downcast_ref::<T>().map(|parent| upcast(parent))
            }))),
        });
        self
    }

    /// Binds an enumeration to its host type: a value-to-name projection and
    /// a name-to-value parser used for input coercion.
    pub fn bind_enum<T, F, G>(mut self, to_name: F, from_name: G) -> Self
    where
        T: TypeDefinition,
        F: Fn(&T) -> &'static str + Send + Sync + 'static,
        G: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        self.enum_binding = Some(EnumBinding {
            to_name: Arc::new(move |any| any.downcast_ref::<T>().map(|value| to_name(value).to_owned())),
            from_name: Arc::new(move |name| {
                from_name(name).map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    /// Binds a custom scalar to its host type via serialize/parse closures.
    pub fn bind_scalar<T, F, G>(mut self, serialize: F, parse: G) -> Self
    where
        T: TypeDefinition,
        F: Fn(&T) -> Result<serde_json::Value, FieldError> + Send + Sync + 'static,
        G: Fn(&serde_json::Value) -> Result<T, FieldError> + Send + Sync + 'static,
    {
        self.scalar_binding = Some(ScalarBinding {
            serialize: Arc::new(move |any| {
                let value = any
                    .downcast_ref::<T>()
                    .ok_or_else(|| FieldError::type_mismatch("value is not an instance of its scalar class"))?;
                let json = serialize(value)?;
                Value::from_json(json).map_err(|err| FieldError::type_mismatch(err.to_string()))
            }),
            parse: Arc::new(move |value| {
                let json = value
                    .clone()
                    .into_json()
                    .map_err(|err| FieldError::coercion(err.to_string()))?;
                Ok(Arc::new(parse(&json)?) as Arc<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    /// Installs the constructor that builds instances of an input class from
    /// coerced engine values.
    pub fn constructor<T, F>(mut self, build: F) -> Self
    where
        T: TypeDefinition,
        F: Fn(&ArgumentValues) -> Result<T, FieldError> + Send + Sync + 'static,
    {
        self.input_constructor = Some(Arc::new(move |values| {
            Ok(Arc::new(build(values)?) as Arc<dyn Any + Send + Sync>)
        }));
        self
    }
}

impl ParentHandle {
    pub(crate) fn downcast<T: TypeDefinition>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    pub(crate) fn as_interface<I: TypeDefinition + ?Sized + 'static>(&self) -> Option<&I> {
        let entry = self.compiled.upcasts.get(&TypeId::of::<I>())?;
        let upcast = entry.downcast_ref::<UpcastTo<I>>()?;
        (upcast.0)(self.instance.as_ref())
    }
}
