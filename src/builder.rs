//! Fluent configurators for retry policies and exception filters.
//!
//! Mirrors the teacher's consuming-`self` builder idiom
//! (`ExponentialBackoff::with_max_attempts`, `RetryOps::max_retries`):
//! every method takes `self` by value and returns `Self`, so a
//! configurator reads as a chain ending in [`RetryConfigurator::build`]
//! / [`ExceptionConfigurator::build`]. Spec.md §6's builder surface is
//! the literal method list below.

use core::time::Duration;

use crate::exception_filter::{ExceptionFilter, TypeSet};
use crate::retry::RetryPolicy;
use crate::types::ErrorVec;

/// Builds a [`RetryPolicy`] one option at a time.
///
/// Each method installs the named policy outright (these are mutually
/// exclusive choices, not accumulating fragments) — the last call
/// before [`build`](Self::build) wins, matching a fluent configurator
/// where later calls override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct RetryConfigurator {
    policy: Option<RetryPolicy>,
}

impl RetryConfigurator {
    /// Starts with no policy selected (defaults to
    /// [`RetryPolicy::None`] if [`build`](Self::build) is called
    /// without any other call first).
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs [`RetryPolicy::None`].
    #[inline]
    pub const fn none(mut self) -> Self {
        self.policy = Some(RetryPolicy::None);
        self
    }

    /// Installs [`RetryPolicy::Immediate`] with up to `limit` retries.
    #[inline]
    pub const fn immediate(mut self, limit: u32) -> Self {
        self.policy = Some(RetryPolicy::Immediate { limit });
        self
    }

    /// Installs [`RetryPolicy::Interval`] from an explicit schedule.
    pub fn intervals(mut self, durations: impl IntoIterator<Item = Duration>) -> Self {
        let intervals: ErrorVec<Duration> = durations.into_iter().collect();
        self.policy = Some(RetryPolicy::Interval { intervals });
        self
    }

    /// Installs [`RetryPolicy::Interval`] from `count` copies of
    /// `duration`.
    pub fn interval(mut self, count: u32, duration: Duration) -> Self {
        self.policy = Some(RetryPolicy::interval_repeated(count, duration));
        self
    }

    /// Installs [`RetryPolicy::Interval`] from an explicit schedule
    /// given as milliseconds, per spec.md §6's "int-valued interval
    /// overloads interpret integers as milliseconds".
    pub fn intervals_ms(self, millis: impl IntoIterator<Item = u64>) -> Self {
        self.intervals(millis.into_iter().map(Duration::from_millis))
    }

    /// Installs [`RetryPolicy::Interval`] from `count` copies of
    /// `duration_ms` milliseconds.
    pub fn interval_ms(self, count: u32, duration_ms: u64) -> Self {
        self.interval(count, Duration::from_millis(duration_ms))
    }

    /// Installs [`RetryPolicy::Incremental`].
    #[inline]
    pub const fn incremental(mut self, limit: u32, initial: Duration, step: Duration) -> Self {
        self.policy = Some(RetryPolicy::Incremental { limit, initial, step });
        self
    }

    /// Installs [`RetryPolicy::Exponential`].
    #[inline]
    pub const fn exponential(mut self, limit: u32, min: Duration, max: Duration, delta: Duration) -> Self {
        self.policy = Some(RetryPolicy::Exponential { limit, min, max, delta });
        self
    }

    /// Finishes configuration, defaulting to [`RetryPolicy::None`] if
    /// no option was selected.
    pub fn build(self) -> RetryPolicy {
        self.policy.unwrap_or(RetryPolicy::None)
    }
}

/// Builds an [`ExceptionFilter<E>`] one option at a time.
///
/// As with [`RetryConfigurator`], each method installs the named
/// variant outright; the last call before [`build`](Self::build) wins.
pub struct ExceptionConfigurator<E: 'static> {
    filter: Option<ExceptionFilter<E>>,
}

impl<E: 'static> Default for ExceptionConfigurator<E> {
    fn default() -> Self {
        Self { filter: None }
    }
}

impl<E: 'static> ExceptionConfigurator<E> {
    /// Starts with no filter selected (defaults to
    /// [`ExceptionFilter::All`] if [`build`](Self::build) is called
    /// without any other call first).
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs [`ExceptionFilter::All`].
    pub fn all(mut self) -> Self {
        self.filter = Some(ExceptionFilter::All);
        self
    }

    /// Installs [`ExceptionFilter::Except`] over the given types.
    pub fn except(mut self, types: TypeSet) -> Self {
        self.filter = Some(ExceptionFilter::Except(types));
        self
    }

    /// Installs [`ExceptionFilter::Except`] over the single type `T`.
    pub fn except_type<T: 'static>(self) -> Self {
        self.except(TypeSet::new().insert::<T>())
    }

    /// Installs [`ExceptionFilter::Selected`] over the given types.
    pub fn selected(mut self, types: TypeSet) -> Self {
        self.filter = Some(ExceptionFilter::Selected(types));
        self
    }

    /// Installs [`ExceptionFilter::Selected`] over the single type `T`.
    pub fn selected_type<T: 'static>(self) -> Self {
        self.selected(TypeSet::new().insert::<T>())
    }

    /// Installs [`ExceptionFilter::Typed`] with the given predicate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(ExceptionFilter::Typed(crate::types::alloc_type::Box::new(predicate)));
        self
    }

    /// Finishes configuration, defaulting to [`ExceptionFilter::All`]
    /// if no option was selected.
    pub fn build(self) -> ExceptionFilter<E> {
        self.filter.unwrap_or(ExceptionFilter::All)
    }
}
