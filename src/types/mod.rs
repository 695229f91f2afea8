//! Shared value types used across the pipe, retry, and lifecycle modules.

use smallvec::SmallVec;

pub mod alloc_type;

pub use alloc_type::*;

/// `SmallVec`-backed collection for accumulating small, usually-short
/// lists (prior exceptions, specification failures, observer errors)
/// without heap allocation in the common case.
///
/// Mirrors the teacher crate's `ErrorVec = SmallVec<[E; 2]>`.
pub type ErrorVec<E> = SmallVec<[E; 2]>;
