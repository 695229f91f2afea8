//! Per-attempt retry snapshots.

use core::time::Duration;

use crate::types::ErrorVec;
use super::policy::RetryPolicy;

/// Immutable snapshot of one retry attempt.
///
/// Attempt indices are monotonically non-decreasing across the
/// sequence of contexts produced for one send (spec.md §3). Callers
/// must observe `delay` before invoking the downstream pipe again;
/// `next()` does not sleep itself.
#[derive(Debug, Clone)]
pub struct RetryContext<E> {
    attempt: u32,
    exception: E,
    delay: Duration,
    can_retry: bool,
    prior_exceptions: ErrorVec<E>,
}

impl<E> RetryContext<E> {
    /// Builds the context produced by the very first failure: `attempt
    /// == 0`, no prior exceptions.
    pub(crate) fn initial(exception: E, delay: Duration, can_retry: bool) -> Self {
        Self { attempt: 0, exception, delay, can_retry, prior_exceptions: ErrorVec::new() }
    }

    /// The 0-based index of this attempt.
    #[inline]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The failure that produced this context.
    #[inline]
    pub const fn exception(&self) -> &E {
        &self.exception
    }

    /// The delay to wait before the *next* invocation.
    #[inline]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Every exception observed on attempts prior to this one.
    ///
    /// `prior_exceptions().len() == attempt()` always holds (spec.md §8).
    #[inline]
    pub fn prior_exceptions(&self) -> &[E] {
        &self.prior_exceptions
    }

    /// Whether another attempt is permitted from this context.
    #[inline]
    pub const fn can_retry(&self) -> bool {
        self.can_retry
    }

    /// Consumes this context, returning the triggering exception and
    /// the full history of prior exceptions in attempt order.
    pub fn into_parts(self) -> (E, ErrorVec<E>) {
        (self.exception, self.prior_exceptions)
    }

    /// Produces the context for the *next* attempt given a fresh
    /// failure `exception` and the policy that governs this retry.
    ///
    /// Appends the current `exception` to `prior_exceptions`,
    /// increments `attempt`, and recomputes `delay`/`can_retry` from
    /// `policy`.
    pub fn next(self, exception: E, policy: &RetryPolicy) -> Self {
        let next_attempt = self.attempt + 1;
        let mut prior_exceptions = self.prior_exceptions;
        prior_exceptions.push(self.exception);
        let can_retry = next_attempt < policy.limit();
        let delay = policy.delay(next_attempt);
        Self { attempt: next_attempt, exception, delay, can_retry, prior_exceptions }
    }
}
