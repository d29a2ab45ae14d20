//! Scoped ownership of a pooled object.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Weak;

use crate::runtime::WorkSpawner;

use super::object_pool::{PoolShared, Slot};
use super::PooledObject;

/// Exclusive ownership of a pooled object until it is returned.
///
/// The object goes back through the pool's return path exactly once: either
/// through an explicit [`dispose`](Self::dispose) (or
/// [`dispose_on`](Self::dispose_on)), or when the lease goes out of scope. A
/// scope-exit return is counted as a resurrection in the pool diagnostics.
///
/// The lease holds only a weak reference to its pool; if the pool is gone by
/// the time the lease is returned, the object is released directly.
#[must_use = "dropping a lease immediately returns the object to the pool"]
pub struct Lease<T: PooledObject> {
    // `None` only after the return path has taken the slot.
    slot: Option<Slot<T>>,
    pool: Weak<PoolShared<T>>,
}

impl<T: PooledObject> Lease<T> {
    pub(crate) const fn new(slot: Slot<T>, pool: Weak<PoolShared<T>>) -> Self {
        Self {
            slot: Some(slot),
            pool,
        }
    }

    /// Pool-unique identifier of the leased object.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.slot().id
    }

    /// Return the object to the pool now, on the calling thread.
    pub fn dispose(mut self) {
        self.give_back(false);
    }

    /// Hand the return path to `spawner` and return immediately.
    ///
    /// The reset hook and any destruction run on whatever thread the spawner
    /// picks. The object stays exclusively owned by the spawned task until it
    /// is re-queued or destroyed.
    pub fn dispose_on<S>(mut self, spawner: &S)
    where
        S: WorkSpawner + ?Sized,
    {
        if let Some(slot) = self.slot.take() {
            let pool = self.pool.clone();
            spawner.spawn_work(Box::new(move || return_slot(&pool, slot, false)));
        }
    }

    fn give_back(&mut self, resurrection: bool) {
        if let Some(slot) = self.slot.take() {
            return_slot(&self.pool, slot, resurrection);
        }
    }

    fn slot(&self) -> &Slot<T> {
        self.slot
            .as_ref()
            .expect("lease slot is present until the lease is consumed")
    }
}

fn return_slot<T: PooledObject>(pool: &Weak<PoolShared<T>>, slot: Slot<T>, resurrection: bool) {
    match pool.upgrade() {
        Some(shared) => shared.give_back(slot, resurrection),
        // The pool is gone; dropping the slot runs the release hook.
        None => drop(slot),
    }
}

impl<T: PooledObject> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.slot().object
    }
}

impl<T: PooledObject> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self
            .slot
            .as_mut()
            .expect("lease slot is present until the lease is consumed")
            .object
    }
}

impl<T: PooledObject> Drop for Lease<T> {
    fn drop(&mut self) {
        self.give_back(true);
    }
}

impl<T: PooledObject + fmt::Debug> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id())
            .field("object", &self.slot().object)
            .finish()
    }
}
