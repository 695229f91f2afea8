//! `Connectable<H>`: a registry of shared handles (observers,
//! supervisor children) supporting idempotent disconnect and
//! copy-on-write broadcast snapshots.
//!
//! The arena-of-slots shape mirrors the teacher's small-collection
//! idiom (`ErrorVec`/`TypeSet`): connections are rare and few, so a
//! `Vec` under one lock, scanned linearly on disconnect, is simpler
//! and just as fast as a hash-indexed structure at this scale.

use core::sync::atomic::{AtomicU64, Ordering};

use std::sync::RwLock;

use crate::types::alloc_type::Arc;
use crate::types::Vec;

/// Monotonically increasing identifier assigned to each connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

struct Shared<H: ?Sized> {
    next_id: AtomicU64,
    slots: RwLock<Vec<(HandleId, Arc<H>)>>,
}

/// A registry of connected handles of type `H`.
///
/// Cheaply cloneable: every clone shares the same underlying slots.
/// `H` may be unsized (e.g. `dyn FilterObserver<T, E>`) — values are
/// always stored behind an `Arc`.
pub struct Connectable<H: ?Sized> {
    shared: Arc<Shared<H>>,
}

impl<H: ?Sized> Connectable<H> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { shared: Arc::new(Shared { next_id: AtomicU64::new(0), slots: RwLock::new(Vec::new()) }) }
    }

    /// Registers an already-allocated `value`, returning a handle that
    /// can later [`disconnect`](ConnectHandle::disconnect) it.
    ///
    /// The unsized-friendly counterpart of [`connect`](Self::connect),
    /// used when `H` is a trait object.
    pub fn connect_arc(&self, value: Arc<H>) -> ConnectHandle<H> {
        let id = HandleId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared.slots.write().expect("connectable lock poisoned").push((id, value));
        ConnectHandle { id, shared: Arc::clone(&self.shared) }
    }

    /// A copy-on-write snapshot of every currently connected value, in
    /// connection order.
    pub fn snapshot(&self) -> Vec<Arc<H>> {
        self.shared.slots.read().expect("connectable lock poisoned").iter().map(|(_, v)| Arc::clone(v)).collect()
    }

    /// The number of currently connected values.
    pub fn len(&self) -> usize {
        self.shared.slots.read().expect("connectable lock poisoned").len()
    }

    /// Returns `true` if no values are currently connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H> Connectable<H> {
    /// Wraps `value` in an `Arc` and registers it. Convenience for the
    /// common case where `H` is a concrete, sized type.
    pub fn connect(&self, value: H) -> ConnectHandle<H> {
        self.connect_arc(Arc::new(value))
    }
}

#[cfg(feature = "async")]
impl<H> Connectable<H> {
    /// Invokes `f` against a snapshot of every connected value,
    /// sequentially, collecting the results.
    ///
    /// Snapshotting first means a disconnect racing with this call
    /// never observes a partially-mutated registry mid-iteration.
    pub async fn for_each_async<F, Fut, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(Arc<H>) -> Fut,
        Fut: core::future::Future<Output = R>,
    {
        let snapshot = self.snapshot();
        let mut results = Vec::with_capacity(snapshot.len());
        for value in snapshot {
            results.push(f(value).await);
        }
        results
    }
}

impl<H: ?Sized> Clone for Connectable<H> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<H> Default for Connectable<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// A registration returned by [`Connectable::connect`]/[`connect_arc`](Connectable::connect_arc).
///
/// Dropping this handle does not disconnect the value; call
/// [`disconnect`](Self::disconnect) explicitly. Disconnecting twice,
/// or after the owning [`Connectable`] (and every other clone) has
/// been dropped, is a no-op.
pub struct ConnectHandle<H: ?Sized> {
    id: HandleId,
    shared: Arc<Shared<H>>,
}

impl<H: ?Sized> ConnectHandle<H> {
    /// Removes the associated value from the registry.
    pub fn disconnect(&self) {
        let mut slots = self.shared.slots.write().expect("connectable lock poisoned");
        slots.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_adds_value_to_snapshot() {
        let registry: Connectable<u32> = Connectable::new();
        let _handle = registry.connect(7);
        assert_eq!(registry.len(), 1);
        assert_eq!(*registry.snapshot()[0], 7);
    }

    #[test]
    fn disconnect_removes_only_that_value() {
        let registry: Connectable<u32> = Connectable::new();
        let first = registry.connect(1);
        let _second = registry.connect(2);
        first.disconnect();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(*snapshot[0], 2);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let registry: Connectable<u32> = Connectable::new();
        let handle = registry.connect(1);
        handle.disconnect();
        handle.disconnect();
        assert!(registry.is_empty());
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn for_each_async_visits_every_connected_value() {
        let registry: Connectable<u32> = Connectable::new();
        registry.connect(1);
        registry.connect(2);
        registry.connect(3);
        let results = registry.for_each_async(|v| async move { *v * 10 }).await;
        let sum: u32 = results.into_iter().sum();
        assert_eq!(sum, 60);
    }
}
