//! Filter chains: the `Pipe<T, E>` composition at the center of the
//! framework.
//!
//! `Filter` is deliberately not `async-trait`-based: an `async fn` in a
//! trait is not object-safe, and `Pipe` needs a dynamic, heterogeneous
//! chain of filters. Instead each method returns an explicitly boxed
//! future, the same way the teacher crate boxes `ComposableError`
//! rather than reaching for a trait-object-unfriendly GAT.

use core::future::Future;
use core::pin::Pin;

use crate::error::{PipeError, PipeResult, SpecificationFailure};
use crate::probe::ProbeSink;
use crate::types::alloc_type::{Arc, Box, Vec};

/// A future boxed for storage behind a trait object, as produced by
/// [`Filter::send`] and [`NextFilter::send`].
pub type BoxFuture<'a, O> = Pin<Box<dyn Future<Output = O> + Send + 'a>>;

/// The remainder of a filter chain, as seen by the filter currently
/// executing.
///
/// A filter calls `next.send(ctx)` to continue the chain; the terminal
/// node (after the last configured filter) always resolves `Ok(())`.
pub trait NextFilter<T: Send + 'static, E: Send + 'static>: Send + Sync {
    fn send<'a>(&'a self, ctx: T) -> BoxFuture<'a, PipeResult<(), E>>;
}

/// One stage of a [`Pipe`].
///
/// Implementors receive the context and a handle to the rest of the
/// chain; they decide whether, when, and how many times to invoke
/// `next`. [`probe`](Filter::probe) contributes this filter's
/// configuration to a diagnostic walk (spec.md §6's probe format).
pub trait Filter<T: Send + 'static, E: Send + 'static>: Send + Sync {
    fn send<'a>(&'a self, ctx: T, next: &'a dyn NextFilter<T, E>) -> BoxFuture<'a, PipeResult<(), E>>;

    fn probe(&self, sink: &mut ProbeSink);
}

struct Node<T: Send + 'static, E: Send + 'static> {
    filter: Arc<dyn Filter<T, E>>,
    rest: Arc<dyn NextFilter<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> NextFilter<T, E> for Node<T, E> {
    fn send<'a>(&'a self, ctx: T) -> BoxFuture<'a, PipeResult<(), E>> {
        self.filter.send(ctx, self.rest.as_ref())
    }
}

struct Terminal;

impl<T: Send + 'static, E: Send + 'static> NextFilter<T, E> for Terminal {
    fn send<'a>(&'a self, _ctx: T) -> BoxFuture<'a, PipeResult<(), E>> {
        Box::pin(async { Ok(()) })
    }
}

/// A compiled, immutable filter chain.
///
/// Built once via [`PipeBuilder`]; cheap to clone (an `Arc` to the head
/// node plus an `Arc` per contributing filter).
pub struct Pipe<T: Send + 'static, E: Send + 'static> {
    head: Arc<dyn NextFilter<T, E>>,
    filters: Vec<Arc<dyn Filter<T, E>>>,
}

impl<T: Send + 'static, E: Send + 'static> Clone for Pipe<T, E> {
    fn clone(&self) -> Self {
        Self { head: Arc::clone(&self.head), filters: self.filters.clone() }
    }
}

impl<T: Send + 'static, E: Send + 'static> Pipe<T, E> {
    /// Starts building a new pipe.
    pub fn builder() -> PipeBuilder<T, E> {
        PipeBuilder::new()
    }

    /// Sends `ctx` through every configured filter in append order.
    pub fn send<'a>(&'a self, ctx: T) -> BoxFuture<'a, PipeResult<(), E>> {
        self.head.send(ctx)
    }

    /// Walks every filter's [`Filter::probe`] in append order.
    pub fn probe(&self, sink: &mut ProbeSink) {
        for filter in self.filters.iter() {
            filter.probe(sink);
        }
    }
}

/// A reusable fragment that contributes filters to a [`PipeBuilder`]
/// and/or validates the resulting configuration.
///
/// Mirrors spec.md §4.2's `PipeSpecification<T>`: `apply` may call
/// `builder.append_filter`/`prepend_filter` and returns any validation
/// failures it finds. A non-empty return aborts [`PipeBuilder::build`].
pub trait PipeSpecification<T: Send + 'static, E: Send + 'static> {
    fn apply(&self, builder: &mut PipeBuilder<T, E>) -> Vec<SpecificationFailure>;
}

/// Accumulates filters and specification failures before compiling a
/// [`Pipe`].
///
/// Failures accumulate the way the teacher's `ErrorPipeline` collects
/// `pending_contexts`: every [`PipeSpecification`] applied contributes
/// its failures to one running list, and `build()` aborts with
/// [`PipeError::Configuration`] if that list is non-empty.
pub struct PipeBuilder<T: Send + 'static, E: Send + 'static> {
    filters: Vec<Arc<dyn Filter<T, E>>>,
    failures: Vec<SpecificationFailure>,
}

impl<T: Send + 'static, E: Send + 'static> PipeBuilder<T, E> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self { filters: Vec::new(), failures: Vec::new() }
    }

    /// Appends `filter` to the end of the chain.
    pub fn append_filter(mut self, filter: Arc<dyn Filter<T, E>>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Inserts `filter` at the front of the chain.
    pub fn prepend_filter(mut self, filter: Arc<dyn Filter<T, E>>) -> Self {
        self.filters.insert(0, filter);
        self
    }

    /// Records a validation failure directly, without going through a
    /// [`PipeSpecification`].
    pub fn push_failure(&mut self, failure: SpecificationFailure) {
        self.failures.push(failure);
    }

    /// Applies `spec`, folding any failures it returns into this
    /// builder's accumulated list.
    pub fn apply_specification<S: PipeSpecification<T, E>>(mut self, spec: &S) -> Self {
        let failures = spec.apply(&mut self);
        self.failures.extend(failures);
        self
    }

    /// Compiles the accumulated filters into a [`Pipe`].
    ///
    /// Returns [`PipeError::Configuration`] if any specification
    /// applied during the build reported a failure.
    pub fn build(self) -> PipeResult<Pipe<T, E>, E> {
        if !self.failures.is_empty() {
            return Err(PipeError::Configuration(self.failures));
        }
        let mut chain: Arc<dyn NextFilter<T, E>> = Arc::new(Terminal);
        for filter in self.filters.iter().rev() {
            chain = Arc::new(Node { filter: Arc::clone(filter), rest: chain });
        }
        Ok(Pipe { head: chain, filters: self.filters })
    }
}

impl<T: Send + 'static, E: Send + 'static> Default for PipeBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
