//! Generic object pool with reset/release hooks and diagnostics.
//!
//! Idle objects live in a bounded `crossbeam-channel` used as a lock-free
//! MPMC queue. The number of idle slots is tracked separately in an atomic
//! counter that is reserved with a CAS loop *before* an object is enqueued,
//! so concurrent returns can never push the idle count above the pool size.
//!
//! Leasing never blocks: when no idle object is available a new one is
//! created on the calling thread.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::builders::ObjectPoolBuilder;
use crate::core::fault::panic_to_error;
use crate::core::{AppResult, PoolError};

use super::{Diagnostics, Lease, PooledObject};

/// Pool size used when none is configured.
pub const DEFAULT_POOL_SIZE: usize = 10;

pub(crate) type Factory<T> = Arc<dyn Fn() -> AppResult<T> + Send + Sync>;

/// One pooled object plus the bookkeeping the pool keeps for it.
pub(crate) struct Slot<T: PooledObject> {
    pub(crate) id: u64,
    pub(crate) object: T,
    disposed: AtomicBool,
}

impl<T: PooledObject> Slot<T> {
    const fn new(id: u64, object: T) -> Self {
        Self {
            id,
            object,
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn reset(&mut self) -> AppResult<()> {
        match catch_unwind(AssertUnwindSafe(|| self.object.on_reset())) {
            Ok(result) => result,
            Err(payload) => Err(panic_to_error(payload.as_ref())),
        }
    }

    /// Mark disposed and run the release hook. Returns `false` if another
    /// caller already did.
    fn release(&mut self) -> bool {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let outcome = match catch_unwind(AssertUnwindSafe(|| self.object.on_release())) {
            Ok(result) => result,
            Err(payload) => Err(panic_to_error(payload.as_ref())),
        };
        if let Err(err) = outcome {
            warn!(object_id = self.id, error = %format!("{err:#}"), "release hook failed");
        }
        true
    }
}

impl<T: PooledObject> Drop for Slot<T> {
    fn drop(&mut self) {
        // Objects that outlive their pool are released here.
        self.release();
    }
}

/// State shared between the pool handle and every outstanding lease.
pub(crate) struct PoolShared<T: PooledObject> {
    name: String,
    size: usize,
    idle_tx: Sender<Slot<T>>,
    idle_rx: Receiver<Slot<T>>,
    /// Idle objects plus slots reserved by in-flight returns.
    reserved: AtomicUsize,
    factory: Factory<T>,
    diagnostics: Diagnostics,
    closed: AtomicBool,
    next_id: AtomicU64,
}

impl<T: PooledObject> PoolShared<T> {
    fn create(&self) -> Result<Slot<T>, PoolError> {
        let object = match catch_unwind(AssertUnwindSafe(|| (self.factory)())) {
            Ok(Ok(object)) => object,
            Ok(Err(err)) => return Err(PoolError::Construction(err)),
            Err(payload) => return Err(PoolError::Construction(panic_to_error(payload.as_ref()))),
        };
        self.diagnostics.created.increment();
        self.diagnostics.live.increment();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(Slot::new(id, object))
    }

    /// Reserve an idle slot with a CAS loop. Returns `false` when full.
    fn try_reserve_slot(&self) -> bool {
        let mut current = self.reserved.load(Ordering::Acquire);
        loop {
            if current >= self.size {
                return false;
            }
            match self.reserved.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release_slot(&self) {
        self.reserved.fetch_sub(1, Ordering::AcqRel);
    }

    fn destroy(&self, mut slot: Slot<T>) {
        if slot.release() {
            self.diagnostics.destroyed.increment();
            self.diagnostics.live.decrement();
            debug!(pool = %self.name, object_id = slot.id, "pooled object destroyed");
        }
    }

    /// Enqueue a slot whose idle space was already reserved.
    fn enqueue(&self, slot: Slot<T>) {
        match self.idle_tx.try_send(slot) {
            Ok(()) => {}
            Err(TrySendError::Full(slot) | TrySendError::Disconnected(slot)) => {
                self.release_slot();
                self.destroy(slot);
            }
        }
    }

    pub(crate) fn lease_slot(&self) -> Result<Slot<T>, PoolError> {
        if let Ok(slot) = self.idle_rx.try_recv() {
            self.release_slot();
            self.diagnostics.hits.increment();
            return Ok(slot);
        }
        self.diagnostics.misses.increment();
        debug!(
            pool = %self.name,
            size = self.size,
            "pool empty, creating object on demand; consider increasing the pool size"
        );
        self.create()
    }

    /// The return path for a leased object.
    pub(crate) fn give_back(&self, mut slot: Slot<T>, resurrection: bool) {
        if slot.is_disposed() {
            return;
        }
        if resurrection {
            self.diagnostics.resurrections.increment();
        }
        if self.closed.load(Ordering::Acquire) {
            self.destroy(slot);
            return;
        }
        if !self.try_reserve_slot() {
            self.diagnostics.overflows.increment();
            self.destroy(slot);
            return;
        }
        if let Err(err) = slot.reset() {
            self.release_slot();
            self.diagnostics.reset_failures.increment();
            warn!(
                pool = %self.name,
                object_id = slot.id,
                error = %format!("{err:#}"),
                "reset failed, destroying object"
            );
            self.destroy(slot);
            return;
        }
        self.diagnostics.returned.increment();
        self.enqueue(slot);
        // A shutdown that ran between the closed check and the enqueue has
        // already drained; the slot just queued would otherwise stay idle.
        if self.closed.load(Ordering::SeqCst) {
            self.drain();
        }
    }

    fn drain(&self) -> usize {
        let mut drained = 0;
        while let Ok(slot) = self.idle_rx.try_recv() {
            self.release_slot();
            self.destroy(slot);
            drained += 1;
        }
        drained
    }
}

impl<T: PooledObject> Drop for PoolShared<T> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        let drained = self.drain();
        debug!(pool = %self.name, drained, "object pool dropped");
    }
}

/// A concurrency-safe pool of reusable objects.
///
/// Cloning the pool clones a handle to the same shared state. Idle objects are
/// destroyed when [`shutdown`](Self::shutdown) is called or the last handle is
/// dropped; leases still outstanding at that point are destroyed when they
/// come back.
///
/// ```
/// use poolworks::pooling::{ObjectPool, PooledObject};
///
/// #[derive(Default)]
/// struct Buffer(Vec<u8>);
///
/// impl PooledObject for Buffer {
///     fn on_reset(&mut self) -> poolworks::core::AppResult<()> {
///         self.0.clear();
///         Ok(())
///     }
/// }
///
/// let pool = ObjectPool::<Buffer>::with_default(4).unwrap();
/// {
///     let mut buf = pool.lease().unwrap();
///     buf.0.extend_from_slice(b"hello");
/// } // returned here
/// assert_eq!(pool.idle_count(), 4);
/// ```
pub struct ObjectPool<T: PooledObject> {
    shared: Arc<PoolShared<T>>,
}

impl<T: PooledObject> ObjectPool<T> {
    /// Create a pool of `size` objects built by `factory`.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidSize` if `size` is zero
    /// - `PoolError::Construction` if the factory panics during pre-population
    pub fn new<F>(size: usize, factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder().size(size).factory(factory).build()
    }

    /// Create a pool of `size` default-constructed objects.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidSize` if `size` is zero.
    pub fn with_default(size: usize) -> Result<Self, PoolError>
    where
        T: Default,
    {
        Self::builder().size(size).default_factory().build()
    }

    /// Start building a pool.
    #[must_use]
    pub fn builder() -> ObjectPoolBuilder<T> {
        ObjectPoolBuilder::new()
    }

    pub(crate) fn from_parts(
        name: String,
        size: usize,
        factory: Factory<T>,
    ) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }
        let (idle_tx, idle_rx) = bounded(size);
        let shared = Arc::new(PoolShared {
            name,
            size,
            idle_tx,
            idle_rx,
            reserved: AtomicUsize::new(0),
            factory,
            diagnostics: Diagnostics::default(),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
        });

        while shared.try_reserve_slot() {
            let slot = match shared.create() {
                Ok(slot) => slot,
                Err(err) => {
                    shared.release_slot();
                    return Err(err);
                }
            };
            shared.enqueue(slot);
        }

        info!(pool = %shared.name, size, "object pool initialized");
        Ok(Self { shared })
    }

    /// Lease an object. Never blocks.
    ///
    /// # Errors
    ///
    /// `PoolError::Construction` if the pool was empty and the factory failed.
    pub fn lease(&self) -> Result<Lease<T>, PoolError> {
        let slot = self.shared.lease_slot()?;
        Ok(Lease::new(slot, Arc::downgrade(&self.shared)))
    }

    /// Close the pool and destroy every idle object.
    ///
    /// Objects returned afterwards are destroyed instead of re-queued.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained = self.shared.drain();
        info!(pool = %self.shared.name, drained, "object pool shut down");
    }

    /// Pool name used in logs and faults.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Target number of idle objects.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.size
    }

    /// Objects currently idle in the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.idle_rx.len()
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Diagnostic counters for this pool.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.shared.diagnostics
    }
}

impl<T: PooledObject> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: PooledObject> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("name", &self.shared.name)
            .field("size", &self.shared.size)
            .field("idle", &self.idle_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
