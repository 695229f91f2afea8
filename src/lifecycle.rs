//! Cooperative lifecycle primitives: a one-shot, multi-observer
//! [`Latch`] and the [`Agent`] built from three of them.
//!
//! The teacher crate has no lifecycle primitive of its own; the
//! single-completion, multi-observer shape and the "first settle
//! wins, every clone observes the same outcome" discipline are
//! enriched from `Querent-ai-querent/querent/actors/src/actor_state.rs`,
//! whose `AtomicState` uses a compare-exchange to make state
//! transitions race-proof. `Latch` reaches the same guarantee with a
//! single mutex around the settled state and its waker list rather
//! than a bare atomic, since settling also carries a value or cause.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use std::sync::Mutex;

use crate::error::{PipeError, PipeResult};
use crate::types::alloc_type::Arc;
use crate::types::Vec;

/// The outcome of a settled [`Latch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatchState<V, F> {
    Pending,
    Succeeded(V),
    Faulted(F),
    Cancelled,
}

impl<V, F> LatchState<V, F> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }
}

struct Inner<V, F> {
    state: Mutex<(LatchState<V, F>, Vec<Waker>)>,
}

/// A one-shot, multi-observer resolvable slot.
///
/// Every clone shares the same underlying slot. The first of
/// [`resolve`](Self::resolve)/[`fault`](Self::fault)/[`cancel`](Self::cancel)
/// to run wins; later calls are no-ops. Every outstanding
/// [`wait`](Self::wait) future wakes once the latch settles.
pub struct Latch<V: Clone, F: Clone> {
    inner: Arc<Inner<V, F>>,
}

impl<V: Clone, F: Clone> Latch<V, F> {
    /// Creates a new, pending latch.
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { state: Mutex::new((LatchState::Pending, Vec::new())) }) }
    }

    /// Returns `true` once this latch has settled.
    pub fn is_settled(&self) -> bool {
        self.inner.state.lock().expect("latch mutex poisoned").0.is_settled()
    }

    /// Returns the current state, without waiting.
    pub fn state(&self) -> LatchState<V, F> {
        self.inner.state.lock().expect("latch mutex poisoned").0.clone()
    }

    fn settle(&self, new_state: LatchState<V, F>) {
        let mut guard = self.inner.state.lock().expect("latch mutex poisoned");
        if guard.0.is_pending() {
            guard.0 = new_state;
            for waker in guard.1.drain(..) {
                waker.wake();
            }
        }
    }

    /// Settles this latch successfully with `value`.
    pub fn resolve(&self, value: V) {
        self.settle(LatchState::Succeeded(value));
    }

    /// Settles this latch with a fault.
    pub fn fault(&self, cause: F) {
        self.settle(LatchState::Faulted(cause));
    }

    /// Settles this latch as cancelled.
    pub fn cancel(&self) {
        self.settle(LatchState::Cancelled);
    }

    /// Returns a future that resolves once this latch settles.
    pub fn wait(&self) -> LatchWait<V, F> {
        LatchWait { latch: self.clone() }
    }
}

impl<V: Clone, F: Clone> Clone for Latch<V, F> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<V: Clone, F: Clone> Default for Latch<V, F> {
    fn default() -> Self {
        Self::new()
    }
}

/// The future returned by [`Latch::wait`].
pub struct LatchWait<V: Clone, F: Clone> {
    latch: Latch<V, F>,
}

impl<V: Clone, F: Clone> Future for LatchWait<V, F> {
    type Output = LatchState<V, F>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.latch.inner.state.lock().expect("latch mutex poisoned");
        if guard.0.is_pending() {
            guard.1.push(cx.waker().clone());
            Poll::Pending
        } else {
            Poll::Ready(guard.0.clone())
        }
    }
}

/// A long-lived resource's cooperative lifecycle: readiness, a stop
/// request, and completion, each a one-shot [`Latch`].
///
/// `F` is the fault/reason type shared by all three latches (the
/// cause an agent reports when it fails to become ready, the reason a
/// stop was requested, or the cause completion failed).
pub struct Agent<F: Clone> {
    ready: Latch<(), F>,
    completed: Latch<(), F>,
    stopped: Latch<(), F>,
}

impl<F: Clone> Agent<F> {
    /// Creates a new agent with all three latches pending.
    pub fn new() -> Self {
        Self { ready: Latch::new(), completed: Latch::new(), stopped: Latch::new() }
    }

    /// Resolves once the agent becomes ready (or never, if it faults first).
    pub fn ready(&self) -> &Latch<(), F> {
        &self.ready
    }

    /// Resolves once the agent has fully completed (stopped and
    /// cleaned up).
    pub fn completed(&self) -> &Latch<(), F> {
        &self.completed
    }

    /// Resolves once a stop has been requested.
    pub fn stopped(&self) -> &Latch<(), F> {
        &self.stopped
    }

    /// Marks this agent ready.
    pub fn set_ready(&self) {
        self.ready.resolve(());
    }

    /// Marks this agent as failed to become ready.
    pub fn set_not_ready(&self, cause: F) {
        self.ready.fault(cause);
    }

    /// Requests that this agent stop. `reason` is `None` for a plain
    /// cooperative stop, `Some(cause)` when the stop is itself a
    /// reaction to a fault.
    pub fn stop(&self, reason: Option<F>) {
        match reason {
            Some(cause) => self.stopped.fault(cause),
            None => self.stopped.resolve(()),
        }
    }

    /// Marks this agent fully completed.
    ///
    /// Per spec.md §4.8 ("Completed may only resolve after Stopped is
    /// set"), a caller that completes without having requested a stop
    /// first is treated as an implicit plain stop: `stopped` settles
    /// (if it hasn't already) before `completed` does, so the invariant
    /// holds regardless of call order.
    pub fn complete(&self) {
        if !self.stopped.is_settled() {
            self.stopped.resolve(());
        }
        self.completed.resolve(());
    }

    /// Marks completion itself as faulted.
    ///
    /// Settles `stopped` first when it hasn't already, for the same
    /// reason as [`complete`](Self::complete).
    pub fn fault_complete(&self, cause: F) {
        if !self.stopped.is_settled() {
            self.stopped.resolve(());
        }
        self.completed.fault(cause);
    }

    /// Awaits [`ready`](Self::ready), converting the outcome into a
    /// [`PipeResult`] the way spec.md's error vocabulary defines
    /// `LifecycleFault`: "Ready resolved faulted; surfaced to all
    /// waiters on that latch". Only meaningful when this agent's fault
    /// type `F` is the same type a caller's pipe already uses for `E`.
    pub async fn ready_result(&self) -> PipeResult<(), F> {
        match self.ready.wait().await {
            LatchState::Succeeded(()) => Ok(()),
            LatchState::Faulted(cause) => Err(PipeError::LifecycleFault(cause)),
            LatchState::Cancelled => Err(PipeError::Cancelled),
            LatchState::Pending => unreachable!("wait() only resolves once the latch settles"),
        }
    }
}

impl<F: Clone> Clone for Agent<F> {
    fn clone(&self) -> Self {
        Self { ready: self.ready.clone(), completed: self.completed.clone(), stopped: self.stopped.clone() }
    }
}

impl<F: Clone> Default for Agent<F> {
    fn default() -> Self {
        Self::new()
    }
}
