//! Object pool builder and configuration-driven construction.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ObjectPoolConfig, PoolworksConfig};
use crate::core::{AppResult, PoolError};
use crate::pooling::object_pool::Factory;
use crate::pooling::{ObjectPool, PooledObject, DEFAULT_POOL_SIZE};

/// Builder for [`ObjectPool`].
///
/// A factory must be set, either explicitly or through
/// [`default_factory`](Self::default_factory); `build` fails with
/// `PoolError::MissingFactory` otherwise.
pub struct ObjectPoolBuilder<T: PooledObject> {
    name: String,
    size: usize,
    factory: Option<Factory<T>>,
}

impl<T: PooledObject> ObjectPoolBuilder<T> {
    /// New builder with the default size and the type name as pool name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: type_name::<T>().to_string(),
            size: DEFAULT_POOL_SIZE,
            factory: None,
        }
    }

    /// Pool name used in logs.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of idle objects to keep.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Apply values from a configuration entry.
    #[must_use]
    pub fn config(self, cfg: &ObjectPoolConfig) -> Self {
        self.size(cfg.size)
    }

    /// Infallible factory.
    #[must_use]
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || Ok(factory())));
        self
    }

    /// Fallible factory; errors surface as `PoolError::Construction`.
    #[must_use]
    pub fn try_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> AppResult<T> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Construct objects with `T::default()`.
    #[must_use]
    pub fn default_factory(mut self) -> Self
    where
        T: Default,
    {
        self.factory = Some(Arc::new(|| Ok(T::default())));
        self
    }

    /// Build and pre-populate the pool.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidSize` if the size is zero
    /// - `PoolError::MissingFactory` if no factory was configured
    /// - `PoolError::Construction` if pre-population fails
    pub fn build(self) -> Result<ObjectPool<T>, PoolError> {
        if self.size == 0 {
            return Err(PoolError::InvalidSize);
        }
        let factory = self
            .factory
            .ok_or_else(|| PoolError::MissingFactory(type_name::<T>().to_string()))?;
        ObjectPool::from_parts(self.name, self.size, factory)
    }
}

impl<T: PooledObject> Default for ObjectPoolBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build every pool declared in `cfg`.
///
/// `builder_for` supplies a builder (with its factory) per pool name; name and
/// size are then taken from the configuration.
///
/// # Errors
///
/// `PoolError::InvalidConfig` if `cfg` fails validation, or the first error
/// from building a pool.
pub fn build_pools<T, FB>(
    cfg: &PoolworksConfig,
    mut builder_for: FB,
) -> Result<HashMap<String, ObjectPool<T>>, PoolError>
where
    T: PooledObject,
    FB: FnMut(&str, &ObjectPoolConfig) -> ObjectPoolBuilder<T>,
{
    cfg.validate().map_err(PoolError::InvalidConfig)?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let pool = builder_for(name, pool_cfg)
            .name(name.clone())
            .config(pool_cfg)
            .build()?;
        pools.insert(name.clone(), pool);
    }
    Ok(pools)
}
