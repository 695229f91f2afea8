//! Retry policies and their per-attempt delay formulas.
//!
//! Grounded on the teacher crate's `async_ext::retry::{RetryPolicy,
//! ExponentialBackoff, FixedDelay}`, generalized from two hard-coded
//! policies to the five variants spec'd in spec.md §3/§4.6/§6.

use core::time::Duration;

use super::context::RetryContext;
use crate::exception_filter::ExceptionFilter;
use crate::probe::ProbeSink;
use crate::types::ErrorVec;

/// A schedule of permitted reattempts and the delay before each one.
///
/// Unlike the teacher's `RetryPolicy` trait (which the caller drives
/// attempt-by-attempt via `next_delay`), this type is a closed enum:
/// the five variants spec'd in spec.md §3 are the only legal retry
/// schedules, and each carries the data needed to compute
/// `delay(attempt)` and `limit` without external state.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// Never retries.
    None,
    /// Up to `limit` retries, zero delay between attempts.
    Immediate { limit: u32 },
    /// `limit = intervals.len()`; `delay(i) = intervals[i]`.
    Interval { intervals: ErrorVec<Duration> },
    /// `delay(i) = initial + i * step`, saturating at `Duration::MAX`.
    Incremental { limit: u32, initial: Duration, step: Duration },
    /// `delay(i) = clamp((2^i - 1) * delta, min, max)`.
    Exponential { limit: u32, min: Duration, max: Duration, delta: Duration },
}

impl RetryPolicy {
    /// Convenience constructor for [`RetryPolicy::Interval`] from `count`
    /// copies of the same `duration` (spec.md §6, `interval(count, duration)`).
    pub fn interval_repeated(count: u32, duration: Duration) -> Self {
        let intervals: ErrorVec<Duration> = core::iter::repeat(duration).take(count as usize).collect();
        Self::Interval { intervals }
    }

    /// The maximum number of retries this policy permits.
    pub fn limit(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Immediate { limit } => *limit,
            Self::Interval { intervals } => intervals.len() as u32,
            Self::Incremental { limit, .. } => *limit,
            Self::Exponential { limit, .. } => *limit,
        }
    }

    /// Computes the delay for the given 0-indexed attempt.
    ///
    /// Callers must ensure `attempt < self.limit()`; an out-of-range
    /// attempt on [`RetryPolicy::Interval`] returns [`Duration::ZERO`]
    /// since there is no schedule entry to consult.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Immediate { .. } => Duration::ZERO,
            Self::Interval { intervals } => {
                intervals.get(attempt as usize).copied().unwrap_or(Duration::ZERO)
            },
            Self::Incremental { initial, step, .. } => {
                initial.saturating_add(step.saturating_mul(attempt))
            },
            Self::Exponential { min, max, delta, .. } => exponential_delay(attempt, *min, *max, *delta),
        }
    }

    /// Called on the first failure classified by `exception_filter`.
    ///
    /// Returns `(matches, initial_context)` where `matches` reflects
    /// whether `exception_filter` accepted `err`; the initial context
    /// always has `attempt == 0`, an empty `prior_exceptions`, and
    /// `delay == self.delay(0)`.
    pub fn can_retry<E>(
        &self,
        err: E,
        exception_filter: &ExceptionFilter<E>,
    ) -> (bool, RetryContext<E>)
    where
        E: core::any::Any,
    {
        let matches = !matches!(self, Self::None) && exception_filter.matches(&err);
        let can_retry = matches && self.limit() > 0;
        let delay = self.delay(0);
        (matches, RetryContext::initial(err, delay, can_retry))
    }

    /// Contributes this policy's shape to a diagnostic [`ProbeSink`]
    /// walk, per spec.md §6's probe format: `{ policy, limit, intervals?,
    /// min?, max?, delta? }`.
    pub fn probe(&self) -> ProbeSink {
        let node = ProbeSink::new(self.name()).field("limit", self.limit());
        match self {
            Self::None | Self::Immediate { .. } => node,
            Self::Interval { intervals } => intervals
                .iter()
                .enumerate()
                .fold(node, |n, (i, d)| n.field(interval_field_name(i), *d)),
            Self::Incremental { initial, step, .. } => {
                node.field("initial", *initial).field("step", *step)
            },
            Self::Exponential { min, max, delta, .. } => {
                node.field("min", *min).field("max", *max).field("delta", *delta)
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Immediate { .. } => "Immediate",
            Self::Interval { .. } => "Interval",
            Self::Incremental { .. } => "Incremental",
            Self::Exponential { .. } => "Exponential",
        }
    }
}

/// Field names for per-index interval entries (`interval_0`, `interval_1`, …),
/// keeping [`ProbeSink`]'s flat `(String, ProbeValue)` field list intact
/// rather than introducing a nested array value variant just for this case.
fn interval_field_name(index: usize) -> crate::types::alloc_type::String {
    use core::fmt::Write;
    let mut name = crate::types::alloc_type::String::new();
    let _ = write!(name, "interval_{index}");
    name
}

/// `clamp((2^attempt - 1) * delta, min, max)`, with `min` acting as a
/// floor rather than a base addend, so attempt 0 and attempt 1 both
/// land on `min` whenever `delta <= min` (spec.md §8 scenario 3:
/// min=1s, max=10s, delta=1s yields `[1, 1, 3, 7, 10]`). Returns `max`
/// directly instead of overflowing when `2^attempt` would not fit.
fn exponential_delay(attempt: u32, min: Duration, max: Duration, delta: Duration) -> Duration {
    let factor: Option<u32> = 2u64
        .checked_pow(attempt)
        .and_then(|p| p.checked_sub(1))
        .and_then(|p| u32::try_from(p).ok());
    let Some(factor) = factor else {
        return max;
    };
    let Some(scaled) = delta.checked_mul(factor) else {
        return max;
    };
    scaled.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_has_zero_delay_and_bounded_limit() {
        let policy = RetryPolicy::Immediate { limit: 3 };
        assert_eq!(policy.limit(), 3);
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(2), Duration::ZERO);
    }

    #[test]
    fn interval_reads_schedule_by_index() {
        let policy = RetryPolicy::Interval {
            intervals: [
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
            .into_iter()
            .collect(),
        };
        assert_eq!(policy.limit(), 3);
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }

    #[test]
    fn interval_repeated_builds_n_copies() {
        let policy = RetryPolicy::interval_repeated(3, Duration::from_secs(1));
        assert_eq!(policy.limit(), 3);
        assert_eq!(policy.delay(1), Duration::from_secs(1));
    }

    #[test]
    fn incremental_grows_linearly() {
        let policy = RetryPolicy::Incremental {
            limit: 5,
            initial: Duration::from_millis(100),
            step: Duration::from_millis(50),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(150));
        assert_eq!(policy.delay(4), Duration::from_millis(300));
    }

    #[test]
    fn exponential_matches_spec_schedule() {
        // spec.md §8 scenario 3: limit=5, min=1s, max=10s, delta=1s
        // expected delays = [1, 1, 3, 7, 10] seconds
        let policy = RetryPolicy::Exponential {
            limit: 5,
            min: Duration::from_secs(1),
            max: Duration::from_secs(10),
            delta: Duration::from_secs(1),
        };
        let expected = [1u64, 1, 3, 7, 10];
        for (i, secs) in expected.iter().enumerate() {
            assert_eq!(policy.delay(i as u32), Duration::from_secs(*secs), "attempt {i}");
        }
    }

    #[test]
    fn exponential_never_overflows() {
        let policy = RetryPolicy::Exponential {
            limit: 64,
            min: Duration::from_secs(1),
            max: Duration::from_secs(60),
            delta: Duration::from_secs(1),
        };
        for attempt in [0, 10, 31, 32, 63] {
            let d = policy.delay(attempt);
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(60));
        }
    }

    #[test]
    fn none_never_retries() {
        let policy = RetryPolicy::None;
        assert_eq!(policy.limit(), 0);
        let filter: ExceptionFilter<&str> = ExceptionFilter::All;
        let (matches, ctx) = policy.can_retry("boom", &filter);
        assert!(!matches);
        assert!(!ctx.can_retry());
    }

    #[test]
    fn probe_exposes_policy_name_and_limit() {
        let policy = RetryPolicy::Immediate { limit: 3 };
        let sink = policy.probe();
        assert_eq!(sink.name(), "Immediate");
        assert_eq!(sink.field_value("limit"), Some(&crate::probe::ProbeValue::U32(3)));
    }

    #[test]
    fn probe_exposes_exponential_shape_fields() {
        let policy = RetryPolicy::Exponential {
            limit: 5,
            min: Duration::from_secs(1),
            max: Duration::from_secs(10),
            delta: Duration::from_secs(1),
        };
        let sink = policy.probe();
        assert_eq!(sink.name(), "Exponential");
        assert_eq!(
            sink.field_value("min"),
            Some(&crate::probe::ProbeValue::Duration(Duration::from_secs(1)))
        );
        assert_eq!(
            sink.field_value("max"),
            Some(&crate::probe::ProbeValue::Duration(Duration::from_secs(10)))
        );
    }

    #[test]
    fn probe_exposes_each_interval_entry() {
        let policy = RetryPolicy::Interval {
            intervals: [Duration::from_millis(100), Duration::from_millis(200)]
                .into_iter()
                .collect(),
        };
        let sink = policy.probe();
        assert_eq!(
            sink.field_value("interval_0"),
            Some(&crate::probe::ProbeValue::Duration(Duration::from_millis(100)))
        );
        assert_eq!(
            sink.field_value("interval_1"),
            Some(&crate::probe::ProbeValue::Duration(Duration::from_millis(200)))
        );
    }
}
