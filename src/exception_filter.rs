//! Composable predicates that classify which failures a retry policy
//! should treat as retryable.
//!
//! Mirrors the teacher crate's single-predicate
//! [`TransientError`](crate::traits::TransientError) trait but
//! generalizes it to the four variants spec'd for retry policies:
//! match everything, match everything except a type set, match only a
//! type set, or defer to an arbitrary typed predicate.

use crate::types::alloc_type::Box;
use core::any::{Any, TypeId};

/// A set of type identifiers used by [`ExceptionFilter::Except`] and
/// [`ExceptionFilter::Selected`].
///
/// Small by construction (retry configuration rarely names more than a
/// handful of exception types), so a linear scan over a `SmallVec` is
/// used rather than a hash set — the same trade-off the teacher makes
/// for its `ErrorVec`.
#[derive(Default)]
pub struct TypeSet(crate::types::ErrorVec<TypeId>);

impl TypeSet {
    /// Creates an empty type set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T` to the set.
    #[inline]
    pub fn insert<T: 'static>(mut self) -> Self {
        self.0.push(TypeId::of::<T>());
        self
    }

    /// Returns `true` if `id` was inserted into this set.
    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.0.iter().any(|t| *t == id)
    }
}

impl FromIterator<TypeId> for TypeSet {
    fn from_iter<I: IntoIterator<Item = TypeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Classifies whether an error of type `E` should be retried.
///
/// A [`RetryPolicy`](crate::retry::policy::RetryPolicy) holds exactly
/// one `ExceptionFilter`; composition across variants is not part of
/// the public surface (policies hold one filter, as in spec.md §4.5).
pub enum ExceptionFilter<E: 'static> {
    /// Always matches.
    All,
    /// Matches unless `err` is an instance of one of `types`.
    Except(TypeSet),
    /// Matches only if `err` is an instance of one of `types`.
    Selected(TypeSet),
    /// Matches if `err` can be narrowed to `E` itself and the predicate
    /// returns `true`.
    Typed(Box<dyn Fn(&E) -> bool + Send + Sync>),
}

impl<E: 'static> ExceptionFilter<E> {
    /// Evaluates this filter against `err`.
    ///
    /// `err` is type-erased via `Any` so that `Except`/`Selected` can
    /// perform an exact-type membership check (the host language here
    /// has no subclassing, so "instance of" degenerates to exact type
    /// equality per spec.md §4.5).
    pub fn matches(&self, err: &E) -> bool
    where
        E: Any,
    {
        match self {
            Self::All => true,
            Self::Except(types) => !types.contains((err as &dyn Any).type_id()),
            Self::Selected(types) => types.contains((err as &dyn Any).type_id()),
            Self::Typed(predicate) => predicate(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TypeA;
    #[derive(Debug)]
    struct TypeB;

    #[test]
    fn all_always_matches() {
        let filter: ExceptionFilter<TypeA> = ExceptionFilter::All;
        assert!(filter.matches(&TypeA));
    }

    #[test]
    fn selected_matches_only_listed_types() {
        let filter: ExceptionFilter<TypeA> =
            ExceptionFilter::Selected(TypeSet::new().insert::<TypeA>());
        assert!(filter.matches(&TypeA));
    }

    #[test]
    fn except_excludes_listed_types() {
        let filter: ExceptionFilter<TypeA> =
            ExceptionFilter::Except(TypeSet::new().insert::<TypeA>());
        assert!(!filter.matches(&TypeA));
    }

    #[test]
    fn typed_predicate_defers_to_closure() {
        let filter: ExceptionFilter<i32> = ExceptionFilter::Typed(Box::new(|e| *e > 0));
        assert!(filter.matches(&1));
        assert!(!filter.matches(&-1));
    }

    #[test]
    fn selected_rejects_unlisted_type_b_when_evaluated_as_type_a() {
        // Selected(TypeA) only ever sees TypeA values in practice because
        // the filter is keyed by E; this test documents that a disjoint
        // TypeB is simply never constructible against this filter.
        let filter: ExceptionFilter<TypeA> =
            ExceptionFilter::Selected(TypeSet::new().insert::<TypeB>());
        assert!(!filter.matches(&TypeA));
    }
}
