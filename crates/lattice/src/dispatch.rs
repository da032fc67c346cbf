use std::collections::HashSet;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext, SubscriptionFieldFuture};
use async_graphql::Error;
use futures::stream::BoxStream;
use futures::task::noop_waker_ref;
use futures::StreamExt;

use crate::coerce::{coerce_argument, ArgumentValues};
use crate::compile::{CompiledDataField, CompiledResolverField};
use crate::context::{Context, RequestState};
use crate::declare::ResolverInvoke;
use crate::error::{field_error_to_graphql, ErrorCode, FieldError};
use crate::lookahead::snapshot;
use crate::request::ResolverRequest;
use crate::type_spec::TypeSpec;
use crate::value::{to_field_value, ParentHandle, Resolved};

fn err_future<'a>(err: Error) -> FieldFuture<'a> {
    let failed: Result<Option<FieldValue<'a>>, Error> = Err(err);
    FieldFuture::new(futures::future::ready(failed))
}

/// Shape A: a pure attribute read. No future is ever allocated; the parent's
/// attribute is snapshot through the pre-compiled accessor and converted.
/// A missing parent (the query root) falls back to the declared default.
pub(crate) fn data_field_future<'a>(
    ctx: &ResolverContext<'a>,
    field: &Arc<CompiledDataField>,
    abstracts: &Arc<HashSet<String>>,
) -> FieldFuture<'a> {
    let result = (|| {
        let parent = ctx.parent_value.try_downcast_ref::<ParentHandle>().ok();
        let resolved = match parent {
            Some(handle) => (field.accessor)(handle)?,
            None => match &field.default_value {
                Some(default) => return Ok(FieldValue::value(default.clone())),
                None => Resolved::Null,
            },
        };
        to_field_value(resolved, &field.type_spec, abstracts)
    })();
    match result {
        Ok(value) => FieldFuture::Value(Some(value)),
        Err(err) => err_future(field_error_to_graphql(err)),
    }
}

/// Shapes B and C: a resolver call. Synchronous adapters complete eagerly;
/// future adapters are polled once inline (sync demotion) and only reach the
/// engine's future machinery when they actually suspend.
pub(crate) fn resolver_field_future<'a>(
    ctx: ResolverContext<'a>,
    field: &Arc<CompiledResolverField>,
    abstracts: &Arc<HashSet<String>>,
) -> FieldFuture<'a> {
    let request = match prepare_request(&ctx, field) {
        Ok(request) => request,
        Err(err) => return err_future(err),
    };
    match &field.invoke {
        ResolverInvoke::Sync(resolve) => {
            let outcome =
                resolve(request).and_then(|resolved| to_field_value(resolved, &field.type_spec, abstracts));
            match outcome {
                Ok(value) => FieldFuture::Value(Some(value)),
                Err(err) => err_future(field_error_to_graphql(err)),
            }
        }
        ResolverInvoke::Future(resolve) => {
            let mut future = resolve(request);
            let mut task = TaskContext::from_waker(noop_waker_ref());
            match future.as_mut().poll(&mut task) {
                Poll::Ready(outcome) => {
                    let outcome =
                        outcome.and_then(|resolved| to_field_value(resolved, &field.type_spec, abstracts));
                    match outcome {
                        Ok(value) => FieldFuture::Value(Some(value)),
                        Err(err) => err_future(field_error_to_graphql(err)),
                    }
                }
                Poll::Pending => {
                    let type_spec = field.type_spec.clone();
                    let abstracts = abstracts.clone();
                    FieldFuture::new(async move {
                        let resolved = future.await.map_err(field_error_to_graphql)?;
                        let value: FieldValue<'a> =
                            to_field_value(resolved, &type_spec, &abstracts).map_err(field_error_to_graphql)?;
                        Ok(Some(value))
                    })
                }
            }
        }
        ResolverInvoke::Stream(_) => err_future(
            field_error_to_graphql(FieldError::with_code("stream resolvers cannot serve plain fields", ErrorCode::ResolverException)),
        ),
    }
}

/// Subscription dispatch: drives the adapter's stream, converting each item
/// and terminating the stream after the first failed item.
pub(crate) fn subscription_field_future<'a>(
    ctx: ResolverContext<'a>,
    field: Arc<CompiledResolverField>,
    abstracts: Arc<HashSet<String>>,
) -> SubscriptionFieldFuture<'a> {
    SubscriptionFieldFuture::new(async move {
        let request = prepare_request(&ctx, &field)?;
        let resolve = match &field.invoke {
            ResolverInvoke::Stream(resolve) => resolve.clone(),
            _ => {
                return Err(field_error_to_graphql(FieldError::with_code(
                    "subscription fields require stream resolvers",
                    ErrorCode::ResolverException,
                )));
            }
        };
        let stream = resolve(request).map_err(field_error_to_graphql)?;
        Ok(convert_stream(stream, field.type_spec.clone(), abstracts))
    })
}

fn convert_stream<'a>(
    stream: BoxStream<'static, Result<Resolved, FieldError>>,
    type_spec: TypeSpec,
    abstracts: Arc<HashSet<String>>,
) -> BoxStream<'a, Result<FieldValue<'a>, Error>> {
    stream
        .map(move |item| -> Result<FieldValue<'a>, Error> {
            match item {
                Ok(resolved) => to_field_value(resolved, &type_spec, &abstracts).map_err(field_error_to_graphql),
                Err(err) => Err(field_error_to_graphql(FieldError::with_code(err.message, ErrorCode::StreamTerminated))),
            }
        })
        .scan(false, |errored, item| {
            if *errored {
                return std::future::ready(None);
            }
            *errored = item.is_err();
            std::future::ready(Some(item))
        })
        .boxed()
}

/// Assembles the uniform adapter input: the parent handle, the coerced
/// keyword arguments (no allocation when the field declares none), and the
/// per-request context when the resolver asked for it.
fn prepare_request(ctx: &ResolverContext<'_>, field: &CompiledResolverField) -> Result<ResolverRequest, Error> {
    let parent = ctx.parent_value.try_downcast_ref::<ParentHandle>().ok().cloned();
    let mut args = ArgumentValues::default();
    for (name, plan) in &field.coercers {
        if let Some(accessor) = ctx.args.get(name.as_str()) {
            let coerced = coerce_argument(plan, accessor.as_value()).map_err(field_error_to_graphql)?;
            args.insert(name.clone(), coerced);
        }
    }
    let context = if field.needs_context {
        Some(Context {
            state: ctx.ctx.data_opt::<RequestState>().map(|state| state.0.clone()),
            graph: snapshot(ctx),
        })
    } else {
        None
    };
    Ok(ResolverRequest {
        parent,
        context,
        args,
    })
}
