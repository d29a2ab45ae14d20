//! Object pooling: the pool, its leases, lifecycle hooks and diagnostics.

pub mod counter;
pub mod diagnostics;
pub mod lease;
pub mod object_pool;
pub mod pooled;

pub use counter::Counter;
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use lease::Lease;
pub use object_pool::{ObjectPool, DEFAULT_POOL_SIZE};
pub use pooled::{PooledObject, PooledObjectWrapper};
