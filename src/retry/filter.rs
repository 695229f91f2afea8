//! The [`Filter`] that drives a [`RetryPolicy`] against a downstream
//! chain.
//!
//! Grounded on the teacher's `async_ext::retry::{retry_with_policy,
//! retry_with_metadata}`: the sleep between attempts is a caller-
//! supplied hook rather than a hard-coded runtime call, so this crate
//! stays usable outside tokio. A `runtime-tokio`-gated constructor
//! supplies the obvious default.

use core::any::Any;
use core::time::Duration;

use crate::context::CarriesCancellation;
use crate::error::{PipeError, PipeResult};
use crate::exception_filter::ExceptionFilter;
use crate::pipe::{BoxFuture, Filter, NextFilter};
use crate::probe::ProbeSink;
use crate::types::alloc_type::{Arc, Box};

use super::context::RetryContext;
use super::policy::RetryPolicy;

/// A runtime-neutral delay hook: given a [`Duration`], returns a boxed
/// future that resolves once that much time has elapsed.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps a downstream filter chain with retry/backoff behavior.
///
/// Drives `policy`/`exception_filter` the way
/// [`RetryContext::next`](crate::retry::context::RetryContext::next)
/// documents: each failure advances the context, sleeps for its
/// computed delay (unless the context's cancellation token trips
/// first), and resends. Exhaustion raises
/// [`PipeError::RetryExhausted`]; a non-matching error or any
/// non-[`PipeError::Pipeline`] failure passes through unchanged.
pub struct RetryFilter<E: Send + 'static> {
    policy: RetryPolicy,
    exception_filter: ExceptionFilter<E>,
    sleep: SleepFn,
}

impl<E: Send + 'static> RetryFilter<E> {
    /// Builds a retry filter with an explicit sleep hook.
    pub fn new(policy: RetryPolicy, exception_filter: ExceptionFilter<E>, sleep: SleepFn) -> Self {
        Self { policy, exception_filter, sleep }
    }

    /// Builds a retry filter backed by `tokio::time::sleep`.
    #[cfg(feature = "runtime-tokio")]
    pub fn with_tokio_sleep(policy: RetryPolicy, exception_filter: ExceptionFilter<E>) -> Self {
        let sleep: SleepFn = Arc::new(|delay: Duration| -> BoxFuture<'static, ()> {
            Box::pin(tokio::time::sleep(delay))
        });
        Self::new(policy, exception_filter, sleep)
    }
}

impl<T, E> Filter<T, E> for RetryFilter<E>
where
    T: Clone + CarriesCancellation + Send + Sync + 'static,
    E: Any + Send + 'static,
{
    fn send<'a>(&'a self, ctx: T, next: &'a dyn NextFilter<T, E>) -> BoxFuture<'a, PipeResult<(), E>> {
        Box::pin(async move {
            let mut history: Option<RetryContext<E>> = None;
            loop {
                match next.send(ctx.clone()).await {
                    Ok(()) => return Ok(()),
                    Err(PipeError::Pipeline(err)) => {
                        if !self.exception_filter.matches(&err) {
                            return Err(PipeError::Pipeline(err));
                        }
                        let advanced = match history.take() {
                            None => RetryContext::initial(err, self.policy.delay(0), self.policy.limit() > 0),
                            Some(prev) => prev.next(err, &self.policy),
                        };
                        if !advanced.can_retry() {
                            let (primary, prior) = advanced.into_parts();
                            return Err(PipeError::RetryExhausted { primary, prior: prior.into_vec() });
                        }

                        #[cfg(feature = "tracing")]
                        tracing::debug!(attempt = advanced.attempt(), delay = ?advanced.delay(), "retrying");

                        if ctx.cancellation().is_cancelled() {
                            return Err(PipeError::Cancelled);
                        }
                        (self.sleep)(advanced.delay()).await;
                        if ctx.cancellation().is_cancelled() {
                            return Err(PipeError::Cancelled);
                        }
                        history = Some(advanced);
                    },
                    Err(other) => return Err(other),
                }
            }
        })
    }

    fn probe(&self, sink: &mut ProbeSink) {
        let mut node = ProbeSink::new("RetryFilter");
        node.push_child(self.policy.probe());
        sink.push_child(node);
    }
}
