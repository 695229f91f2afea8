//! Filter observation: side-channel hooks that watch a filter's
//! sends without participating in its control flow.
//!
//! An observer failure never masks the primary outcome — the same
//! "accumulate, don't replace" discipline the teacher applies to
//! `ErrorPipeline::pending_contexts` versus its primary `result`.

use crate::error::{PipeError, PipeResult};
use crate::pipe::{BoxFuture, Filter, NextFilter};
use crate::probe::ProbeSink;
use crate::registry::Connectable;
use crate::types::alloc_type::{Arc, Box};
use crate::types::Vec;

/// Watches a filter's sends without influencing them.
///
/// All three hooks default to a no-op success so implementors only
/// override what they need.
pub trait FilterObserver<T, E>: Send + Sync {
    fn pre_send<'a>(&'a self, _ctx: &'a T) -> BoxFuture<'a, PipeResult<(), E>> {
        Box::pin(async { Ok(()) })
    }

    fn post_send<'a>(&'a self, _ctx: &'a T) -> BoxFuture<'a, PipeResult<(), E>> {
        Box::pin(async { Ok(()) })
    }

    fn send_fault<'a>(&'a self, _ctx: &'a T, _err: &'a PipeError<E>) -> BoxFuture<'a, PipeResult<(), E>> {
        Box::pin(async { Ok(()) })
    }
}

/// Wraps a [`Filter`] with a [`Connectable`] registry of
/// [`FilterObserver`]s, dispatching `pre_send`/`post_send`/`send_fault`
/// around the inner filter's send.
pub struct ObservedFilter<F, T, E> {
    inner: F,
    observers: Connectable<dyn FilterObserver<T, E>>,
}

impl<F, T, E> ObservedFilter<F, T, E> {
    /// Wraps `inner` with an empty observer registry.
    pub fn new(inner: F) -> Self {
        Self { inner, observers: Connectable::new() }
    }

    /// Registers `observer`, returning a handle that can later
    /// disconnect it.
    pub fn observe(&self, observer: Arc<dyn FilterObserver<T, E>>) -> crate::registry::ConnectHandle<dyn FilterObserver<T, E>> {
        self.observers.connect_arc(observer)
    }
}

impl<F, T, E> Filter<T, E> for ObservedFilter<F, T, E>
where
    F: Filter<T, E>,
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn send<'a>(&'a self, ctx: T, next: &'a dyn NextFilter<T, E>) -> BoxFuture<'a, PipeResult<(), E>> {
        Box::pin(async move {
            let observers = self.observers.snapshot();
            let mut observer_errors: Vec<PipeError<E>> = Vec::new();

            for observer in &observers {
                if let Err(e) = observer.pre_send(&ctx).await {
                    observer_errors.push(e);
                }
            }

            let outcome = self.inner.send(ctx_ref_clone(&ctx), next).await;

            match &outcome {
                Ok(()) => {
                    for observer in &observers {
                        if let Err(e) = observer.post_send(&ctx).await {
                            observer_errors.push(e);
                        }
                    }
                },
                Err(err) => {
                    for observer in &observers {
                        if let Err(e) = observer.send_fault(&ctx, err).await {
                            observer_errors.push(e);
                        }
                    }
                },
            }

            if observer_errors.is_empty() {
                outcome
            } else if let Err(primary) = outcome {
                observer_errors.insert(0, primary);
                Err(PipeError::Observer(observer_errors))
            } else {
                Err(PipeError::Observer(observer_errors))
            }
        })
    }

    fn probe(&self, sink: &mut ProbeSink) {
        let mut node = ProbeSink::new("ObservedFilter").field("observers", self.observers.len() as u32);
        self.inner.probe(&mut node);
        sink.push_child(node);
    }
}

/// Clones `ctx` for the inner send while the original stays borrowed
/// for the observer hooks. `T: Clone` is not required crate-wide —
/// only by whichever filters (like this one) need to hold on to `ctx`
/// past the point they hand a copy downstream.
fn ctx_ref_clone<T: Clone>(ctx: &T) -> T {
    ctx.clone()
}

/// An observer that emits `tracing` events around each send, the same
/// integration point the teacher's `async_ext::tracing_ext` gives
/// `ComposableError` — here applied to the observer contract instead of
/// error-context capture, since this crate's failures already carry
/// their own structure via [`PipeError`].
#[cfg(feature = "tracing")]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl<T, E> FilterObserver<T, E> for TracingObserver
where
    T: Send + Sync,
    E: core::fmt::Debug + Send,
{
    fn pre_send<'a>(&'a self, _ctx: &'a T) -> BoxFuture<'a, PipeResult<(), E>> {
        tracing::debug!("filter send starting");
        Box::pin(async { Ok(()) })
    }

    fn post_send<'a>(&'a self, _ctx: &'a T) -> BoxFuture<'a, PipeResult<(), E>> {
        tracing::debug!("filter send completed");
        Box::pin(async { Ok(()) })
    }

    fn send_fault<'a>(&'a self, _ctx: &'a T, err: &'a PipeError<E>) -> BoxFuture<'a, PipeResult<(), E>> {
        tracing::warn!(error = ?err, "filter send failed");
        Box::pin(async { Ok(()) })
    }
}
