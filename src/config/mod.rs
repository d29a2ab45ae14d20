//! Configuration models for pools and processor groups.

pub mod pool;

pub use pool::{ObjectPoolConfig, PoolworksConfig, ProcessorGroupConfig};
