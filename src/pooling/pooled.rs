//! The pooled-object lifecycle contract and a wrapper for foreign types.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::core::AppResult;

/// Lifecycle hooks for a resource managed by an [`ObjectPool`](super::ObjectPool).
///
/// Both hooks run on the thread that returns or destroys the object. Errors and
/// panics from either hook are caught by the pool: a failed reset turns into a
/// destroy, a failed release is logged and ignored.
pub trait PooledObject: Send + 'static {
    /// Reset state before the object goes back to the idle queue.
    ///
    /// # Errors
    ///
    /// Returning an error makes the pool destroy the object instead.
    fn on_reset(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Release resources when the object is permanently destroyed.
    ///
    /// Called at most once per object.
    ///
    /// # Errors
    ///
    /// Errors are logged; destruction proceeds regardless.
    fn on_release(&mut self) -> AppResult<()> {
        Ok(())
    }
}

// Buffers are cleared on return and keep their allocation.
impl<T: Send + 'static> PooledObject for Vec<T> {
    fn on_reset(&mut self) -> AppResult<()> {
        self.clear();
        Ok(())
    }
}

impl<T: Send + 'static> PooledObject for VecDeque<T> {
    fn on_reset(&mut self) -> AppResult<()> {
        self.clear();
        Ok(())
    }
}

impl PooledObject for String {
    fn on_reset(&mut self) -> AppResult<()> {
        self.clear();
        Ok(())
    }
}

type ResetHook<R> = Arc<dyn Fn(&R) -> AppResult<()> + Send + Sync>;
type ReleaseHook<R> = Arc<dyn Fn(&R) + Send + Sync>;

/// Adapts any resource to [`PooledObject`] through caller-supplied callbacks.
///
/// The resource is held immutably; reset logic that needs to mutate it must go
/// through interior mutability.
///
/// ```
/// use poolworks::pooling::PooledObjectWrapper;
/// use std::sync::Mutex;
///
/// let buf = PooledObjectWrapper::new(Mutex::new(Vec::<u8>::new()))
///     .with_reset(|buf| {
///         buf.lock().unwrap().clear();
///         Ok(())
///     });
/// buf.lock().unwrap().push(1);
/// ```
pub struct PooledObjectWrapper<R> {
    resource: R,
    reset: Option<ResetHook<R>>,
    release: Option<ReleaseHook<R>>,
}

impl<R> PooledObjectWrapper<R> {
    /// Wrap a resource with no hooks.
    pub const fn new(resource: R) -> Self {
        Self {
            resource,
            reset: None,
            release: None,
        }
    }

    /// Set the reset callback.
    #[must_use]
    pub fn with_reset<F>(mut self, reset: F) -> Self
    where
        F: Fn(&R) -> AppResult<()> + Send + Sync + 'static,
    {
        self.reset = Some(Arc::new(reset));
        self
    }

    /// Set the release callback.
    #[must_use]
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.release = Some(Arc::new(release));
        self
    }

    /// The wrapped resource.
    pub const fn resource(&self) -> &R {
        &self.resource
    }
}

impl<R> Deref for PooledObjectWrapper<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: fmt::Debug> fmt::Debug for PooledObjectWrapper<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObjectWrapper")
            .field("resource", &self.resource)
            .field("has_reset", &self.reset.is_some())
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

impl<R: Send + 'static> PooledObject for PooledObjectWrapper<R> {
    fn on_reset(&mut self) -> AppResult<()> {
        match &self.reset {
            Some(reset) => reset(&self.resource),
            None => Ok(()),
        }
    }

    fn on_release(&mut self) -> AppResult<()> {
        if let Some(release) = &self.release {
            release(&self.resource);
        }
        Ok(())
    }
}
