//! `PipeContextSupervisor`: a shared context, cached and multiplexed
//! single-flight across concurrent sends.
//!
//! The cache slot is hand-rolled over a `Mutex` + a
//! `tokio::sync::Notify` — the same primitives
//! [`CancellationToken`](crate::context::CancellationToken) already
//! uses — rather than reaching for a `once_cell`/`arc-swap`-style
//! crate; the teacher always hand-rolls its own synchronization.

use std::sync::Mutex;

use tokio::sync::Notify;

use crate::error::{PipeError, PipeResult};
use crate::lifecycle::Agent;
use crate::pipe::BoxFuture;
use crate::supervisor::{AgentHandle, Cause, Supervisor};
use crate::types::alloc_type::Arc;

/// Builds the shared context type `T` that a
/// [`PipeContextSupervisor`] multiplexes.
pub trait ContextFactory<T, E>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    /// Creates the single shared context instance.
    fn create_context<'a>(&'a self) -> BoxFuture<'a, PipeResult<T, E>>;

    /// Wraps the shared context for one active send. Defaults to a
    /// plain clone of the shared value; override for per-send setup.
    fn create_active_context<'a>(&'a self, shared: &'a T) -> BoxFuture<'a, PipeResult<T, E>> {
        let shared = shared.clone();
        Box::pin(async move { Ok(shared) })
    }
}

enum Slot<T, E> {
    Empty,
    Creating(Arc<Notify>),
    Ready(T),
    Failed(crate::error::PipeError<E>),
}

enum Action {
    Wait(Arc<Notify>),
    Create(Arc<Notify>),
}

/// A [`Supervisor`] that caches a single shared context `T`, built by
/// `F` on first use and reused by every subsequent send.
///
/// Creation is single-flight: concurrent callers that all observe an
/// empty slot subscribe to the same in-flight creation instead of
/// racing to build their own. Every active context handed out by
/// [`send`](Self::send) is tracked as a child of the embedded
/// [`Supervisor`], so [`Supervisor::stop`]'s existing "children drain
/// before completion" invariant also drains active sends before the
/// shared context is invalidated — no special-casing required.
pub struct PipeContextSupervisor<T, E, F>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + 'static,
    F: ContextFactory<T, E>,
{
    supervisor: Supervisor,
    factory: F,
    slot: Mutex<Slot<T, E>>,
}

impl<T, E, F> PipeContextSupervisor<T, E, F>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + 'static,
    F: ContextFactory<T, E>,
{
    /// Creates a supervisor with an empty cache slot.
    pub fn new(factory: F) -> Self {
        Self { supervisor: Supervisor::new(), factory, slot: Mutex::new(Slot::Empty) }
    }

    /// The embedded supervisor, tracking active sends as children.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Returns the shared context, creating it on first use.
    ///
    /// Concurrent callers racing here either win the single creation
    /// or subscribe to it; all observe the same created context, or
    /// the same creation failure.
    pub async fn shared_context(&self) -> PipeResult<T, E> {
        loop {
            let action = {
                let mut slot = self.slot.lock().expect("context supervisor mutex poisoned");
                match &mut *slot {
                    Slot::Ready(ctx) => return Ok(ctx.clone()),
                    Slot::Failed(err) => return Err(err.clone()),
                    Slot::Creating(notify) => Action::Wait(Arc::clone(notify)),
                    Slot::Empty => {
                        let notify = Arc::new(Notify::new());
                        *slot = Slot::Creating(Arc::clone(&notify));
                        Action::Create(notify)
                    },
                }
            };
            match action {
                Action::Wait(notify) => notify.notified().await,
                Action::Create(notify) => return self.create_and_publish(notify).await,
            }
        }
    }

    async fn create_and_publish(&self, notify: Arc<Notify>) -> PipeResult<T, E> {
        let result = self.factory.create_context().await;
        let mut slot = self.slot.lock().expect("context supervisor mutex poisoned");
        *slot = match &result {
            Ok(ctx) => Slot::Ready(ctx.clone()),
            Err(err) => Slot::Failed(err.clone()),
        };
        drop(slot);
        notify.notify_waiters();
        result
    }

    /// Fetches (or creates) the shared context, wraps an active
    /// context around it, tracks that active context as a supervised
    /// child for the duration of `use_context`, then untracks it.
    ///
    /// The active handle's own lifecycle is stopped before it is marked
    /// complete (spec.md §4.8: "Completed may only resolve after
    /// Stopped is set") — there is no separate external stop request
    /// for a one-send-lived handle, so `send` issues it itself once
    /// `use_context` returns.
    pub async fn send<Fut, R>(&self, use_context: impl FnOnce(T) -> Fut) -> PipeResult<R, E>
    where
        Fut: core::future::Future<Output = PipeResult<R, E>>,
    {
        if self.supervisor.is_stopping() {
            return Err(PipeError::Cancelled);
        }
        let shared = self.shared_context().await?;
        let active = self.factory.create_active_context(&shared).await?;

        let handle: Arc<Agent<Cause>> = Arc::new(Agent::new());
        handle.set_ready();
        let connect_handle = self.supervisor.add(handle.clone());

        let result = use_context(active).await;

        handle.stop(None);
        handle.complete();
        connect_handle.disconnect();
        result
    }

    /// Drops the cached shared context (if any), forcing the next
    /// [`shared_context`](Self::shared_context) call to recreate it.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().expect("context supervisor mutex poisoned");
        *slot = Slot::Empty;
    }

    /// Refuses further [`send`](Self::send) calls, awaits every
    /// outstanding active handle, then disposes the shared context.
    ///
    /// Per spec.md §4.10/§9: active handles always drain before the
    /// shared context is disposed, since they are tracked as children
    /// of the embedded [`Supervisor`] and `Supervisor::stop` already
    /// waits for every child's completion before resolving its own.
    pub async fn stop(&self, reason: Option<Cause>) {
        self.supervisor.stop(reason).await;
        self.invalidate();
    }
}
