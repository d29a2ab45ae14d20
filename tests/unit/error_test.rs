//! Tests for error types

use poolworks::core::{PoolError, ProcessorError};
use std::error::Error as _;

#[test]
fn test_invalid_size_error() {
    let err = PoolError::InvalidSize;
    assert_eq!(format!("{}", err), "pool size must be greater than zero");
}

#[test]
fn test_missing_factory_error() {
    let err = PoolError::MissingFactory("Conn".to_string());
    assert_eq!(
        format!("{}", err),
        "no factory configured and no default construction available for `Conn`"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("size must be greater than 0".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: size must be greater than 0");
}

#[test]
fn test_construction_error_keeps_chain() {
    let cause = anyhow::anyhow!("connection refused").context("open socket");
    let err = PoolError::Construction(cause);
    assert_eq!(
        format!("{}", err),
        "object construction failed: open socket: connection refused"
    );
    assert!(err.source().is_some());
}

#[test]
fn test_already_started_error() {
    let err = ProcessorError::AlreadyStarted("worker-0".to_string());
    assert_eq!(format!("{}", err), "processor `worker-0` is already started");
}

#[test]
fn test_invalid_affinity_error() {
    let err = ProcessorError::InvalidAffinity { core: 9, available: 4 };
    assert_eq!(
        format!("{}", err),
        "invalid affinity: core 9 requested, 4 cores available"
    );
}

#[test]
fn test_spawn_error_has_source() {
    let err = ProcessorError::Spawn {
        name: "worker-1".to_string(),
        source: std::io::Error::other("out of threads"),
    };
    assert!(format!("{}", err).starts_with("failed to spawn thread for processor `worker-1`"));
    assert!(err.source().is_some());
}
