//! Tests for builder modules

use poolworks::builders::{build_pools, ObjectPoolBuilder};
use poolworks::config::{ObjectPoolConfig, PoolworksConfig};
use poolworks::core::PoolError;
use poolworks::pooling::{ObjectPool, DEFAULT_POOL_SIZE};
use std::collections::HashMap;

#[test]
fn test_builder_defaults() {
    let pool = ObjectPoolBuilder::<String>::new()
        .default_factory()
        .build()
        .unwrap();
    assert_eq!(pool.size(), DEFAULT_POOL_SIZE);
    assert_eq!(pool.idle_count(), DEFAULT_POOL_SIZE);
    assert_eq!(pool.name(), std::any::type_name::<String>());
}

#[test]
fn test_builder_name_and_config() {
    let pool = ObjectPool::<Vec<u8>>::builder()
        .name("buffers")
        .config(&ObjectPoolConfig { size: 3 })
        .factory(|| Vec::with_capacity(64))
        .build()
        .unwrap();
    assert_eq!(pool.name(), "buffers");
    assert_eq!(pool.size(), 3);
    assert_eq!(pool.diagnostics().created().value(), 3);
}

#[test]
fn test_builder_zero_size() {
    let err = ObjectPoolBuilder::<String>::new().size(0).default_factory().build().unwrap_err();
    assert!(matches!(err, PoolError::InvalidSize));
}

#[test]
fn test_builder_missing_factory() {
    let err = ObjectPoolBuilder::<String>::new().size(2).build().unwrap_err();
    assert!(matches!(err, PoolError::MissingFactory(name) if name == std::any::type_name::<String>()));
}

#[test]
fn test_builder_failing_factory() {
    let err = ObjectPoolBuilder::<String>::new()
        .size(2)
        .try_factory(|| Err(anyhow::anyhow!("no backend")))
        .build()
        .unwrap_err();
    assert!(matches!(err, PoolError::Construction(_)));
    assert!(err.to_string().contains("no backend"));
}

#[test]
fn test_build_pools_from_config() {
    let mut pools = HashMap::new();
    pools.insert("small".to_string(), ObjectPoolConfig { size: 1 });
    pools.insert("large".to_string(), ObjectPoolConfig { size: 5 });
    let cfg = PoolworksConfig {
        pools,
        groups: HashMap::new(),
    };

    let built = build_pools(&cfg, |_, _| ObjectPoolBuilder::<String>::new().default_factory()).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built["small"].size(), 1);
    assert_eq!(built["large"].idle_count(), 5);
    assert_eq!(built["large"].name(), "large");
}

#[test]
fn test_build_pools_invalid_config() {
    let err = build_pools(&PoolworksConfig::default(), |_, _| {
        ObjectPoolBuilder::<String>::new().default_factory()
    })
    .unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}
