//! Supervisor: an [`Agent`] whose own readiness and completion are
//! derived from a set of child agents.
//!
//! Grounded on `Querent-ai-querent/querent/actors/src/supervisor.rs`'s
//! child-tracking shape, re-expressed with this crate's own
//! `Latch`/`Agent` types rather than that crate's actor mailboxes: a
//! supervisor here is not itself a message-processing actor, just the
//! aggregation point spec.md calls for.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::lifecycle::{Agent, LatchState};
use crate::pipe::BoxFuture;
use crate::registry::{Connectable, ConnectHandle};
use crate::types::alloc_type::{Arc, Box};

/// Opaque fault/reason payload threaded through supervised agents.
///
/// A plain message rather than a generic error type: supervisors
/// aggregate heterogeneous children, so there is no single `E` to
/// parameterize them over.
pub type Cause = Arc<str>;

/// Object-safe view of an [`Agent`] used so a [`Supervisor`] can hold
/// heterogeneous children in one registry.
pub trait AgentHandle: Send + Sync {
    fn ready<'a>(&'a self) -> BoxFuture<'a, LatchState<(), Cause>>;
    fn completed<'a>(&'a self) -> BoxFuture<'a, LatchState<(), Cause>>;
    fn request_stop(&self, reason: Option<Cause>);
}

impl AgentHandle for Agent<Cause> {
    fn ready<'a>(&'a self) -> BoxFuture<'a, LatchState<(), Cause>> {
        let latch = self.ready().clone();
        Box::pin(async move { latch.wait().await })
    }

    fn completed<'a>(&'a self) -> BoxFuture<'a, LatchState<(), Cause>> {
        let latch = self.completed().clone();
        Box::pin(async move { latch.wait().await })
    }

    fn request_stop(&self, reason: Option<Cause>) {
        self.stop(reason);
    }
}

/// An [`Agent`] whose readiness and completion aggregate over a set of
/// child [`AgentHandle`]s.
///
/// Readiness: ready once every child is ready; faulted with the first
/// child fault encountered. Completion: `stop()` forwards to every
/// child and only resolves this supervisor's own `completed` once
/// every child has completed — the same invariant
/// [`PipeContextSupervisor`](crate::context_supervisor::PipeContextSupervisor)
/// relies on to drain active handles before shared disposal.
pub struct Supervisor {
    agent: Agent<Cause>,
    children: Connectable<dyn AgentHandle>,
    stopping: AtomicBool,
}

impl Supervisor {
    /// Creates a supervisor with no children yet.
    pub fn new() -> Self {
        Self { agent: Agent::new(), children: Connectable::new(), stopping: AtomicBool::new(false) }
    }

    /// This supervisor's own lifecycle latches.
    pub fn agent(&self) -> &Agent<Cause> {
        &self.agent
    }

    /// Registers `child`, returning a handle that can later remove it
    /// from supervision.
    ///
    /// If this supervisor is already stopping (or stopped),
    /// `child.request_stop` is invoked immediately with the same
    /// reason before returning, per spec.md §4.9: a child added after
    /// stop was requested must not be left running.
    pub fn add(&self, child: Arc<dyn AgentHandle>) -> ConnectHandle<dyn AgentHandle> {
        let handle = self.children.connect_arc(child.clone());
        if self.stopping.load(Ordering::Acquire) {
            child.request_stop(None);
        }
        handle
    }

    /// The number of currently supervised children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    ///
    /// Callers that hand out new supervised work (like
    /// [`PipeContextSupervisor`](crate::context_supervisor::PipeContextSupervisor))
    /// consult this to refuse new sends once a stop is underway.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Awaits every child's readiness, then marks this supervisor
    /// ready. The first child fault (or cancellation) short-circuits
    /// and marks this supervisor not-ready with that cause.
    pub async fn await_children_ready(&self) {
        let children = self.children.snapshot();
        for child in &children {
            match child.ready().await {
                LatchState::Succeeded(()) => continue,
                LatchState::Faulted(cause) => {
                    self.agent.set_not_ready(cause);
                    return;
                },
                LatchState::Cancelled => {
                    self.agent.set_not_ready(Cause::from("child cancelled before becoming ready"));
                    return;
                },
                LatchState::Pending => unreachable!("a resolved wait is never pending"),
            }
        }
        self.agent.set_ready();
    }

    /// Forwards `reason` to every child, waits for every child to
    /// complete, then marks this supervisor's own stop/completion.
    pub async fn stop(&self, reason: Option<Cause>) {
        self.stopping.store(true, Ordering::Release);
        self.agent.stop(reason.clone());
        let children = self.children.snapshot();
        for child in &children {
            child.request_stop(reason.clone());
        }
        for child in &children {
            let _ = child.completed().await;
        }
        self.agent.complete();
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_waits_for_every_child() {
        let supervisor = Supervisor::new();
        let child_a: Arc<Agent<Cause>> = Arc::new(Agent::new());
        let child_b: Arc<Agent<Cause>> = Arc::new(Agent::new());
        supervisor.add(child_a.clone());
        supervisor.add(child_b.clone());

        let wait = tokio::spawn({
            let supervisor_ready = supervisor.agent().ready().clone();
            async move { supervisor_ready.wait().await }
        });

        child_a.set_ready();
        // not ready yet: child_b still pending
        tokio::task::yield_now().await;
        assert!(!supervisor.agent().ready().is_settled());

        child_b.set_ready();
        supervisor.await_children_ready().await;
        assert_eq!(supervisor.agent().ready().wait().await, LatchState::Succeeded(()));
        drop(wait);
    }

    #[tokio::test]
    async fn one_child_fault_marks_supervisor_not_ready() {
        let supervisor = Supervisor::new();
        let child: Arc<Agent<Cause>> = Arc::new(Agent::new());
        supervisor.add(child.clone());
        child.set_not_ready(Cause::from("dependency down"));

        supervisor.await_children_ready().await;
        assert_eq!(
            supervisor.agent().ready().wait().await,
            LatchState::Faulted(Cause::from("dependency down"))
        );
    }

    #[tokio::test]
    async fn add_during_stop_immediately_stops_the_new_child() {
        let supervisor = Supervisor::new();
        supervisor.stop(None).await;

        let late_child: Arc<Agent<Cause>> = Arc::new(Agent::new());
        supervisor.add(late_child.clone());
        assert!(late_child.stopped().is_settled());
    }

    #[tokio::test]
    async fn stop_forwards_and_waits_for_children_before_completing() {
        let supervisor = Supervisor::new();
        let child: Arc<Agent<Cause>> = Arc::new(Agent::new());
        supervisor.add(child.clone());

        let child_for_task = child.clone();
        let completer = tokio::spawn(async move {
            child_for_task.stopped().wait().await;
            child_for_task.complete();
        });

        supervisor.stop(None).await;
        completer.await.unwrap();
        assert!(supervisor.agent().completed().is_settled());
        assert!(child.stopped().is_settled());
    }
}
