//! Tests for configuration validation

use poolworks::config::{ObjectPoolConfig, PoolworksConfig, ProcessorGroupConfig};
use poolworks::pooling::DEFAULT_POOL_SIZE;
use poolworks::threading::{Affinity, ThreadPriority};
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_pool_config_defaults() {
    let cfg = ObjectPoolConfig::default();
    assert_eq!(cfg.size, DEFAULT_POOL_SIZE);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_size() {
    let invalid = ObjectPoolConfig { size: 0 };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_group_config_defaults() {
    let cfg = ProcessorGroupConfig::default();
    assert!(cfg.workers >= 1);
    assert!(!cfg.pin_cores);
    assert_eq!(cfg.priority, ThreadPriority::Normal);
    assert_eq!(cfg.stop_timeout(), Duration::from_secs(5));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_group_config_invalid_values() {
    let no_workers = ProcessorGroupConfig {
        workers: 0,
        ..ProcessorGroupConfig::default()
    };
    assert!(no_workers.validate().is_err());

    let no_timeout = ProcessorGroupConfig {
        stop_timeout_ms: 0,
        ..ProcessorGroupConfig::default()
    };
    assert!(no_timeout.validate().is_err());
}

#[test]
fn test_group_run_options() {
    let cfg = ProcessorGroupConfig {
        workers: 2,
        priority: ThreadPriority::AboveNormal,
        start_paused: true,
        ..ProcessorGroupConfig::default()
    };
    let options = cfg.run_options(1);
    assert_eq!(options.affinity, Affinity::AllCores);
    assert_eq!(options.priority, ThreadPriority::AboveNormal);
    assert!(options.start_paused);

    let pinned = ProcessorGroupConfig {
        pin_cores: true,
        ..cfg
    };
    let cores = num_cpus::get();
    assert_eq!(pinned.run_options(0).affinity, Affinity::Core(0));
    assert_eq!(pinned.run_options(cores).affinity, Affinity::Core(0));
}

#[test]
fn test_root_config_requires_entries() {
    let empty = PoolworksConfig::default();
    assert!(empty.validate().is_err());

    let mut pools = HashMap::new();
    pools.insert("buffers".to_string(), ObjectPoolConfig { size: 4 });
    let cfg = PoolworksConfig {
        pools,
        groups: HashMap::new(),
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_root_config_reports_bad_entry() {
    let mut groups = HashMap::new();
    groups.insert(
        "io".to_string(),
        ProcessorGroupConfig {
            workers: 0,
            ..ProcessorGroupConfig::default()
        },
    );
    let cfg = PoolworksConfig {
        pools: HashMap::new(),
        groups,
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("group `io` invalid"));
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "pools": { "buffers": { "size": 16 } },
        "groups": { "io": { "workers": 3, "priority": "highest", "stop_timeout_ms": 250 } }
    }"#;
    let cfg = PoolworksConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.pools["buffers"].size, 16);
    let io = &cfg.groups["io"];
    assert_eq!(io.workers, 3);
    assert_eq!(io.priority, ThreadPriority::Highest);
    assert_eq!(io.stop_timeout(), Duration::from_millis(250));
    assert!(!io.start_paused);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(PoolworksConfig::from_json_str("{ not json").is_err());
    assert!(PoolworksConfig::from_json_str(r#"{ "pools": { "p": { "size": 0 } } }"#).is_err());
}

#[test]
fn test_from_lookup_overlays_values() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("POOLWORKS_POOL_SIZE", "32"),
        ("POOLWORKS_WORKERS", " 2 "),
        ("POOLWORKS_PIN_CORES", "true"),
        ("POOLWORKS_STOP_TIMEOUT_MS", "1500"),
    ]);
    let cfg = PoolworksConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();
    assert_eq!(cfg.pools["default"].size, 32);
    let group = &cfg.groups["default"];
    assert_eq!(group.workers, 2);
    assert!(group.pin_cores);
    assert_eq!(group.stop_timeout_ms, 1500);
}

#[test]
fn test_from_lookup_defaults_and_errors() {
    let cfg = PoolworksConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg.pools["default"].size, DEFAULT_POOL_SIZE);

    let err = PoolworksConfig::from_lookup(|key| {
        (key == "POOLWORKS_POOL_SIZE").then(|| "many".to_string())
    })
    .unwrap_err();
    assert!(err.contains("POOLWORKS_POOL_SIZE"));

    let zero = PoolworksConfig::from_lookup(|key| {
        (key == "POOLWORKS_POOL_SIZE").then(|| "0".to_string())
    });
    assert!(zero.is_err());
}
