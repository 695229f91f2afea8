//! Crate-wide error type and result aliases.
//!
//! Every failure mode named in the component design (configuration,
//! payload factories, retry exhaustion, cancellation, lifecycle faults,
//! pipeline failures, and observer aggregation) is represented as a
//! variant of [`PipeError`]. Like the teacher crate's `ComposableError`,
//! this type wraps a user error `E` rather than replacing it, and
//! exposes `source()` so error chains remain walkable.

use core::fmt::{Debug, Display};

use crate::types::alloc_type::{Box, String, Vec};

/// Failure produced by building a [`Pipe`](crate::pipe::Pipe) from
/// [`PipeSpecification`](crate::pipe::PipeSpecification)s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationFailure {
    /// Human-readable description of what failed during validation.
    pub message: String,
}

impl SpecificationFailure {
    /// Creates a new specification failure with the given message.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}

impl Display for SpecificationFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Unified error type for every failure mode the framework surfaces.
///
/// `E` is the error type produced by user filters/operations. Every
/// variant other than [`PipeError::Configuration`] carries `E` (or a
/// list of `E`s) so the original cause is never discarded.
#[derive(Debug, Clone)]
pub enum PipeError<E> {
    /// A [`PipeBuilder`](crate::pipe::PipeBuilder) rejected the pipeline;
    /// carries every [`SpecificationFailure`] collected during the build.
    Configuration(Vec<SpecificationFailure>),
    /// A `get_or_add_payload`/`add_or_update_payload` factory raised `E`.
    PayloadFactory(E),
    /// A [`RetryFilter`](crate::retry::filter::RetryFilter) exhausted its
    /// policy; `primary` is the most recent failure, `prior` every
    /// exception observed on earlier attempts.
    RetryExhausted { primary: E, prior: Vec<E> },
    /// A cancellation token tripped while the operation was suspended
    /// (waiting on a retry delay, a downstream send, or a lifecycle
    /// latch).
    Cancelled,
    /// An [`Agent`](crate::lifecycle::Agent)'s `ready` latch resolved
    /// faulted; surfaced to every waiter on that latch.
    LifecycleFault(E),
    /// A downstream filter failed and no retry policy claimed it.
    Pipeline(E),
    /// One or more [`FilterObserver`](crate::observer::FilterObserver)
    /// callbacks failed. These never replace the primary outcome; they
    /// ride alongside it.
    Observer(Vec<PipeError<E>>),
}

impl<E: Display> Display for PipeError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Configuration(failures) => {
                write!(f, "pipeline configuration rejected: ")?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{failure}")?;
                }
                Ok(())
            },
            Self::PayloadFactory(e) => write!(f, "payload factory failed: {e}"),
            Self::RetryExhausted { primary, prior } => {
                write!(f, "retry exhausted after {} prior attempt(s): {primary}", prior.len())
            },
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::LifecycleFault(e) => write!(f, "lifecycle faulted: {e}"),
            Self::Pipeline(e) => write!(f, "pipeline failure: {e}"),
            Self::Observer(errors) => {
                write!(f, "{} observer callback(s) failed", errors.len())
            },
        }
    }
}

#[cfg(feature = "std")]
impl<E: Display + Debug> std::error::Error for PipeError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl<E> PipeError<E> {
    /// Returns `true` if this is a [`PipeError::Cancelled`].
    #[inline]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is a [`PipeError::RetryExhausted`].
    #[inline]
    pub const fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }

    /// Maps the wrapped user error(s), preserving the variant shape.
    pub fn map_err<F, E2>(self, mut f: F) -> PipeError<E2>
    where
        F: FnMut(E) -> E2,
    {
        match self {
            Self::Configuration(v) => PipeError::Configuration(v),
            Self::PayloadFactory(e) => PipeError::PayloadFactory(f(e)),
            Self::RetryExhausted { primary, prior } => PipeError::RetryExhausted {
                primary: f(primary),
                prior: prior.into_iter().map(f).collect(),
            },
            Self::Cancelled => PipeError::Cancelled,
            Self::LifecycleFault(e) => PipeError::LifecycleFault(f(e)),
            Self::Pipeline(e) => PipeError::Pipeline(f(e)),
            Self::Observer(errs) => {
                PipeError::Observer(errs.into_iter().map(|e| e.map_err(&mut f)).collect())
            },
        }
    }
}

/// Result alias wrapping failures in [`PipeError`].
pub type PipeResult<T, E> = Result<T, PipeError<E>>;

/// Boxed [`PipeError`] for reduced stack size, mirroring the teacher's
/// `BoxedComposableError`.
pub type BoxedPipeError<E> = Box<PipeError<E>>;

/// Result alias with a boxed [`PipeError`].
pub type BoxedPipeResult<T, E> = Result<T, BoxedPipeError<E>>;
