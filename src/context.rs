//! `PipeContext`: the payload bag and cancellation token carried
//! through a [`Pipe`](crate::pipe::Pipe).

use core::any::{Any, TypeId};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PipeError, PipeResult};
use crate::types::alloc_type::Arc;
use crate::types::Vec;

/// Type-erased, linearly-scanned bag of per-context payloads.
///
/// Mirrors the teacher crate's small-collection idiom (`ErrorVec`,
/// `TypeSet`): a pipe context rarely carries more than a handful of
/// distinct payload types, so a scanned `Vec` beats a hash map's
/// bookkeeping. A single lock (or, without `std`, a `RefCell`) guards
/// the whole bag — the teacher always hand-rolls its synchronization
/// rather than reaching for a concurrent-map crate.
#[cfg(feature = "std")]
pub struct PayloadBag {
    slots: std::sync::Mutex<Vec<(TypeId, Arc<dyn Any + Send + Sync>)>>,
}

#[cfg(feature = "std")]
impl PayloadBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self { slots: std::sync::Mutex::new(Vec::new()) }
    }

    /// Returns `true` if a payload of type `P` is present.
    pub fn has_payload<P: 'static>(&self) -> bool {
        let slots = self.slots.lock().expect("payload bag mutex poisoned");
        slots.iter().any(|(id, _)| *id == TypeId::of::<P>())
    }

    /// Returns the existing payload of type `P`, if any.
    pub fn try_get_payload<P: Send + Sync + 'static>(&self) -> Option<Arc<P>> {
        let slots = self.slots.lock().expect("payload bag mutex poisoned");
        slots
            .iter()
            .find(|(id, _)| *id == TypeId::of::<P>())
            .and_then(|(_, v)| Arc::clone(v).downcast::<P>().ok())
    }

    /// Returns the existing payload of type `P`, or builds and stores
    /// one via `factory`. A factory failure surfaces as
    /// [`PipeError::PayloadFactory`].
    pub fn get_or_add_payload<P, F, E>(&self, factory: F) -> PipeResult<Arc<P>, E>
    where
        P: Send + Sync + 'static,
        F: FnOnce() -> Result<P, E>,
    {
        let mut slots = self.slots.lock().expect("payload bag mutex poisoned");
        if let Some((_, existing)) = slots.iter().find(|(id, _)| *id == TypeId::of::<P>()) {
            return Ok(Arc::clone(existing).downcast::<P>().unwrap_or_else(|_| unreachable!("type id matched")));
        }
        let created: Arc<P> = Arc::new(factory().map_err(PipeError::PayloadFactory)?);
        slots.push((TypeId::of::<P>(), created.clone() as Arc<dyn Any + Send + Sync>));
        Ok(created)
    }

    /// Inserts a payload of type `P` via `add` if absent, or replaces
    /// it with `update(&current)` if present.
    pub fn add_or_update_payload<P, A, U>(&self, add: A, update: U) -> Arc<P>
    where
        P: Send + Sync + 'static,
        A: FnOnce() -> P,
        U: FnOnce(&P) -> P,
    {
        let mut slots = self.slots.lock().expect("payload bag mutex poisoned");
        if let Some(slot) = slots.iter_mut().find(|(id, _)| *id == TypeId::of::<P>()) {
            let current =
                Arc::clone(&slot.1).downcast::<P>().unwrap_or_else(|_| unreachable!("type id matched"));
            let updated = Arc::new(update(&current));
            slot.1 = updated.clone() as Arc<dyn Any + Send + Sync>;
            return updated;
        }
        let created = Arc::new(add());
        slots.push((TypeId::of::<P>(), created.clone() as Arc<dyn Any + Send + Sync>));
        created
    }
}

#[cfg(not(feature = "std"))]
pub struct PayloadBag {
    slots: core::cell::RefCell<Vec<(TypeId, Arc<dyn Any + Send + Sync>)>>,
}

#[cfg(not(feature = "std"))]
impl PayloadBag {
    pub fn new() -> Self {
        Self { slots: core::cell::RefCell::new(Vec::new()) }
    }

    pub fn has_payload<P: 'static>(&self) -> bool {
        self.slots.borrow().iter().any(|(id, _)| *id == TypeId::of::<P>())
    }

    pub fn try_get_payload<P: Send + Sync + 'static>(&self) -> Option<Arc<P>> {
        self.slots
            .borrow()
            .iter()
            .find(|(id, _)| *id == TypeId::of::<P>())
            .and_then(|(_, v)| Arc::clone(v).downcast::<P>().ok())
    }

    pub fn get_or_add_payload<P, F, E>(&self, factory: F) -> PipeResult<Arc<P>, E>
    where
        P: Send + Sync + 'static,
        F: FnOnce() -> Result<P, E>,
    {
        let mut slots = self.slots.borrow_mut();
        if let Some((_, existing)) = slots.iter().find(|(id, _)| *id == TypeId::of::<P>()) {
            return Ok(Arc::clone(existing).downcast::<P>().unwrap_or_else(|_| unreachable!("type id matched")));
        }
        let created: Arc<P> = Arc::new(factory().map_err(PipeError::PayloadFactory)?);
        slots.push((TypeId::of::<P>(), created.clone() as Arc<dyn Any + Send + Sync>));
        Ok(created)
    }

    pub fn add_or_update_payload<P, A, U>(&self, add: A, update: U) -> Arc<P>
    where
        P: Send + Sync + 'static,
        A: FnOnce() -> P,
        U: FnOnce(&P) -> P,
    {
        let mut slots = self.slots.borrow_mut();
        if let Some(slot) = slots.iter_mut().find(|(id, _)| *id == TypeId::of::<P>()) {
            let current =
                Arc::clone(&slot.1).downcast::<P>().unwrap_or_else(|_| unreachable!("type id matched"));
            let updated = Arc::new(update(&current));
            slot.1 = updated.clone() as Arc<dyn Any + Send + Sync>;
            return updated;
        }
        let created = Arc::new(add());
        slots.push((TypeId::of::<P>(), created.clone() as Arc<dyn Any + Send + Sync>));
        created
    }
}

impl Default for PayloadBag {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag shared by every clone of a
/// [`PipeContext`].
///
/// `is_cancelled`/`cancel` are available unconditionally (plain
/// `core::sync::atomic::AtomicBool`); the async `cancelled()` wait is
/// only meaningful with an executor, so it requires the
/// `runtime-tokio` feature and is backed by a `tokio::sync::Notify`.
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    #[cfg(feature = "runtime-tokio")]
    notify: Arc<tokio::sync::Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            #[cfg(feature = "runtime-tokio")]
            notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on
    /// any clone of this token.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Trips the flag and wakes every pending [`cancelled`](Self::cancelled) waiter.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
        #[cfg(feature = "runtime-tokio")]
        self.notify.notify_waiters();
    }

    /// Resolves once this token is cancelled.
    #[cfg(feature = "runtime-tokio")]
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Clone for CancellationToken {
    fn clone(&self) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            #[cfg(feature = "runtime-tokio")]
            notify: Arc::clone(&self.notify),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

struct PipeContextInner {
    payloads: PayloadBag,
    cancellation: CancellationToken,
}

/// A cheaply-cloneable handle to a payload bag and cancellation token.
///
/// Every clone shares the same underlying bag and token (`Arc`-backed),
/// the way a context object is expected to flow through a filter chain:
/// each filter receives its own handle, but mutations to the payload
/// bag or a `cancel()` call are visible to every other holder.
pub struct PipeContext {
    inner: Arc<PipeContextInner>,
}

impl PipeContext {
    /// Creates a new context with an empty payload bag and a fresh
    /// cancellation token.
    pub fn new() -> Self {
        Self { inner: Arc::new(PipeContextInner { payloads: PayloadBag::new(), cancellation: CancellationToken::new() }) }
    }

    /// The payload bag carried by this context.
    #[inline]
    pub fn payloads(&self) -> &PayloadBag {
        &self.inner.payloads
    }

    /// The cancellation token carried by this context.
    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancellation
    }
}

impl Clone for PipeContext {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Default for PipeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Implemented by context types so generic filters (like
/// [`RetryFilter`](crate::retry::filter::RetryFilter)) can observe
/// cancellation without depending on [`PipeContext`] concretely.
pub trait CarriesCancellation {
    fn cancellation(&self) -> &CancellationToken;
}

impl CarriesCancellation for PipeContext {
    fn cancellation(&self) -> &CancellationToken {
        self.cancellation()
    }
}
