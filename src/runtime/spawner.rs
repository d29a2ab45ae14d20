//! Work spawner implementations.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::warn;

/// A unit of deferred work.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction for running a closure somewhere other than the calling thread.
pub trait WorkSpawner {
    /// Run `work` asynchronously. Must not block on the work itself.
    fn spawn_work(&self, work: Work);
}

/// Spawns one short-lived OS thread per work item.
///
/// If the thread cannot be created the work runs inline so it is never lost.
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name: String,
}

impl ThreadSpawner {
    /// Create a spawner whose threads are named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new("poolworks-return")
    }
}

impl WorkSpawner for ThreadSpawner {
    fn spawn_work(&self, work: Work) {
        // `spawn` drops its closure on failure; keep a second handle to run inline.
        let slot = Arc::new(Mutex::new(Some(work)));
        let task = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                if let Some(work) = task.lock().take() {
                    work();
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn work thread, running inline");
            if let Some(work) = slot.lock().take() {
                work();
            }
        }
    }
}

/// Tokio-based spawner that runs work on the runtime's blocking pool.
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio-runtime")]
impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Create a spawner for the runtime the caller is running on.
    ///
    /// Returns `None` outside a tokio runtime.
    #[must_use]
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

#[cfg(feature = "tokio-runtime")]
impl WorkSpawner for TokioSpawner {
    fn spawn_work(&self, work: Work) {
        drop(self.handle.spawn_blocking(work));
    }
}
