//! A composable pipe/filter middleware framework for structuring
//! asynchronous request/message processing as ordered filter chains,
//! with retry/backoff, exception classification, filter observation,
//! and a cooperative Agent/Supervisor lifecycle wrapped around a
//! cached, multiplexed [`PipeContext`](context::PipeContext).
//!
//! `middleware-pipe` focuses on four pillars:
//! 1. **Pipe/Filter composition** – typed contexts flow through an
//!    ordered chain of [`Filter`](pipe::Filter)s compiled by a
//!    [`PipeBuilder`](pipe::PipeBuilder) from
//!    [`PipeSpecification`](pipe::PipeSpecification) fragments.
//! 2. **Retry** – [`RetryPolicy`](retry::RetryPolicy) variants
//!    (none/immediate/interval/incremental/exponential) paired with an
//!    [`ExceptionFilter`](exception_filter::ExceptionFilter) drive a
//!    [`RetryFilter`](retry::RetryFilter) that re-invokes a downstream
//!    pipe until success or exhaustion.
//! 3. **Observation** – [`FilterObserver`](observer::FilterObserver)s
//!    attach to any filter via [`ObservedFilter`](observer::ObservedFilter)
//!    without participating in its control flow.
//! 4. **Lifecycle & context caching** – [`Agent`](lifecycle::Agent)/
//!    [`Supervisor`](supervisor::Supervisor) model a three-latch
//!    (ready/stopped/completed) cooperative lifecycle;
//!    [`PipeContextSupervisor`](context_supervisor::PipeContextSupervisor)
//!    caches and multiplexes one shared context per supervisor.
//!
//! Each submodule re-exports its public surface from here, so
//! consumers can depend on `middleware_pipe::*` or pick focused pieces.
//!
//! # Examples
//!
//! ## Building and sending a pipe
//!
//! ```
//! use std::sync::Arc;
//! use middleware_pipe::pipe::{BoxFuture, Filter, NextFilter, Pipe};
//! use middleware_pipe::error::PipeResult;
//! use middleware_pipe::probe::ProbeSink;
//!
//! struct Uppercase;
//! impl Filter<String, &'static str> for Uppercase {
//!     fn send<'a>(
//!         &'a self,
//!         ctx: String,
//!         next: &'a dyn NextFilter<String, &'static str>,
//!     ) -> BoxFuture<'a, PipeResult<(), &'static str>> {
//!         Box::pin(async move { next.send(ctx.to_uppercase()).await })
//!     }
//!
//!     fn probe(&self, sink: &mut ProbeSink) {
//!         sink.push_child(ProbeSink::new("Uppercase"));
//!     }
//! }
//!
//! # async fn run() -> PipeResult<(), &'static str> {
//! let pipe: Pipe<String, &'static str> =
//!     Pipe::builder().append_filter(Arc::new(Uppercase)).build()?;
//! pipe.send("hello".to_string()).await
//! # }
//! ```
//!
//! ## Configuring retry
//!
//! ```
//! use std::time::Duration;
//! use middleware_pipe::builder::RetryConfigurator;
//!
//! let policy = RetryConfigurator::new()
//!     .exponential(5, Duration::from_secs(1), Duration::from_secs(10), Duration::from_secs(1))
//!     .build();
//! assert_eq!(policy.limit(), 5);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(feature = "std"), doc = "This build is `no_std` + `alloc` (payload bag and error types only;")]
#![cfg_attr(not(feature = "std"), doc = "lifecycle, registry, and retry-filter modules require `std`).")]

#[cfg(not(feature = "std"))]
extern crate alloc;

/// Fluent configurators for retry policies and exception filters
/// (spec.md §6's builder surface).
pub mod builder;
/// `PipeContext`: the payload bag and cancellation token carried
/// through a pipe.
pub mod context;
/// `PipeContextSupervisor`: a shared context cached and multiplexed
/// across concurrent sends. Requires `runtime-tokio`.
#[cfg(feature = "runtime-tokio")]
pub mod context_supervisor;
/// Crate-wide error type and result aliases.
pub mod error;
/// Composable predicates that classify which failures are retryable.
pub mod exception_filter;
/// Cooperative lifecycle primitives: a one-shot, multi-observer latch
/// and the Agent built from three of them. Requires `std`.
#[cfg(feature = "std")]
pub mod lifecycle;
/// Filter observation: side-channel pre/post/fault hooks. Requires
/// `std` (built on the [`registry`] module's `Connectable`).
#[cfg(feature = "std")]
pub mod observer;
/// Filter & Pipe composition: the ordered chain at the center of the
/// framework.
pub mod pipe;
/// Hierarchical diagnostic tree produced by `probe()` walks.
pub mod probe;
/// `Connectable<H>`: a thread-safe registry of handlers with
/// handle-based disconnect. Requires `std`.
#[cfg(feature = "std")]
pub mod registry;
/// Retry policies, per-attempt context, and the filter that drives
/// them.
pub mod retry;
/// Supervisor: an Agent whose readiness and completion aggregate over
/// a set of child Agents. Requires `std`.
#[cfg(feature = "std")]
pub mod supervisor;
/// Shared `std`/`alloc` type aliases and small-collection types.
pub mod types;

pub use context::{CancellationToken, CarriesCancellation, PipeContext};
#[cfg(feature = "runtime-tokio")]
pub use context_supervisor::{ContextFactory, PipeContextSupervisor};
pub use error::{BoxedPipeError, BoxedPipeResult, PipeError, PipeResult, SpecificationFailure};
pub use exception_filter::{ExceptionFilter, TypeSet};
#[cfg(feature = "std")]
pub use lifecycle::{Agent, Latch, LatchState};
#[cfg(feature = "std")]
pub use observer::{FilterObserver, ObservedFilter};
#[cfg(feature = "tracing")]
pub use observer::TracingObserver;
pub use pipe::{BoxFuture, Filter, NextFilter, Pipe, PipeBuilder, PipeSpecification};
pub use probe::{ProbeSink, ProbeValue};
#[cfg(feature = "std")]
pub use registry::{Connectable, ConnectHandle, HandleId};
pub use retry::{RetryContext, RetryFilter, RetryPolicy};
#[cfg(feature = "std")]
pub use supervisor::{AgentHandle, Cause, Supervisor};
