use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::coerce::ArgumentValues;
use crate::context::Context;
use crate::error::FieldError;
use crate::value::ParentHandle;
use crate::TypeDefinition;

/// Everything a resolver invocation receives, in one owned bundle: the
/// parent handle, the optional per-request context, and the coerced
/// keyword arguments. This is the uniform adapter shape every resolver is
/// invoked through, regardless of its original parameter pattern.
pub struct ResolverRequest {
    pub(crate) parent: Option<ParentHandle>,
    pub(crate) context: Option<Context>,
    pub(crate) args: ArgumentValues,
}

impl ResolverRequest {
    /// The parent instance, downcast to its concrete class.
    pub fn parent<T: TypeDefinition>(&self) -> Result<&T, FieldError> {
        self.parent
            .as_ref()
            .and_then(|handle| handle.downcast::<T>())
            .ok_or_else(|| FieldError::new("field has no parent value of the expected type"))
    }

    /// The parent instance viewed through an implemented interface; used by
    /// resolvers declared on interfaces.
    pub fn parent_interface<I: TypeDefinition + ?Sized + 'static>(&self) -> Result<&I, FieldError> {
        self.parent
            .as_ref()
            .and_then(|handle| handle.as_interface::<I>())
            .ok_or_else(|| FieldError::new("field parent does not implement the expected interface"))
    }

    /// Per-request context; present when the field was declared
    /// `with_context()`.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// The caller-supplied request state, if any.
    pub fn state<S: 'static>(&self) -> Option<&S> {
        self.context.as_ref().and_then(|context| context.state::<S>())
    }

    pub fn args(&self) -> &ArgumentValues {
        &self.args
    }

    /// Shorthand for `args().get(name)`.
    pub fn arg<V: DeserializeOwned>(&self, name: &str) -> Result<V, FieldError> {
        self.args.get(name)
    }

    /// Shorthand for `args().input(name)`.
    pub fn input<T: TypeDefinition>(&self, name: &str) -> Result<Arc<T>, FieldError> {
        self.args.input(name)
    }

    pub fn input_opt<T: TypeDefinition>(&self, name: &str) -> Result<Option<Arc<T>>, FieldError> {
        self.args.input_opt(name)
    }

    pub fn inputs<T: TypeDefinition>(&self, name: &str) -> Result<Vec<Arc<T>>, FieldError> {
        self.args.inputs(name)
    }
}
