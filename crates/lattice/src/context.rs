use std::any::Any;
use std::sync::Arc;

use crate::lookahead::Lookahead;

/// The per-request state value, threaded through the engine's request data
/// channel. Exclusive to one request; dropped when the request ends.
pub(crate) struct RequestState(pub Arc<dyn Any + Send + Sync>);

/// Per-request context handed to resolvers that opt in via `with_context()`.
///
/// Carries the caller-supplied state untouched, plus an owned snapshot of the
/// selection set beneath the current field.
pub struct Context {
    pub(crate) state: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) graph: Lookahead,
}

impl Context {
    /// The caller's state, downcast to its concrete type.
    pub fn state<S: 'static>(&self) -> Option<&S> {
        self.state.as_ref().and_then(|state| state.downcast_ref::<S>())
    }

    /// Lookahead into the selection below the current field.
    pub fn field(&self, name: &str) -> Lookahead {
        self.graph.field(name)
    }

    /// The whole selection graph under the current field.
    pub fn look_ahead(&self) -> &Lookahead {
        &self.graph
    }
}
