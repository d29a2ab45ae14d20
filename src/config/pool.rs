//! Pool and processor-group configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pooling::DEFAULT_POOL_SIZE;
use crate::threading::{Affinity, RunOptions, ThreadPriority};

const ENV_POOL_SIZE: &str = "POOLWORKS_POOL_SIZE";
const ENV_WORKERS: &str = "POOLWORKS_WORKERS";
const ENV_PIN_CORES: &str = "POOLWORKS_PIN_CORES";
const ENV_STOP_TIMEOUT_MS: &str = "POOLWORKS_STOP_TIMEOUT_MS";

/// Object pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectPoolConfig {
    /// Number of idle objects kept by the pool.
    pub size: usize,
}

impl Default for ObjectPoolConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
        }
    }
}

impl ObjectPoolConfig {
    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.size == 0 {
            return Err("size must be greater than 0".into());
        }
        Ok(())
    }
}

/// Processor group configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorGroupConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Pin worker `i` to core `i % cores` instead of allowing all cores.
    pub pin_cores: bool,
    /// Priority recorded for every worker.
    pub priority: ThreadPriority,
    /// Start workers paused.
    pub start_paused: bool,
    /// Graceful stop timeout in milliseconds before a worker is detached.
    pub stop_timeout_ms: u64,
}

impl Default for ProcessorGroupConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            pin_cores: false,
            priority: ThreadPriority::Normal,
            start_paused: false,
            stop_timeout_ms: 5_000,
        }
    }
}

impl ProcessorGroupConfig {
    /// Validate group configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be greater than 0".into());
        }
        if self.stop_timeout_ms == 0 {
            return Err("stop_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Graceful stop timeout.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Run options for the worker at `index`.
    #[must_use]
    pub fn run_options(&self, index: usize) -> RunOptions {
        let affinity = if self.pin_cores {
            Affinity::Core(index % num_cpus::get().max(1))
        } else {
            Affinity::AllCores
        };
        RunOptions::new()
            .with_affinity(affinity)
            .with_priority(self.priority)
            .with_start_paused(self.start_paused)
    }
}

/// Root configuration: named pools and named processor groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolworksConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, ObjectPoolConfig>,
    /// Map of processor group name to configuration.
    pub groups: HashMap<String, ProcessorGroupConfig>,
}

impl PoolworksConfig {
    /// Validate every pool and group and ensure at least one is defined.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() && self.groups.is_empty() {
            return Err("at least one pool or processor group must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        for (name, group) in &self.groups {
            group
                .validate()
                .map_err(|e| format!("group `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a `default` pool and `default` group from the process environment,
    /// loading a `.env` file first if present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a `default` pool and `default` group from `POOLWORKS_*` values
    /// supplied by `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut pool = ObjectPoolConfig::default();
        let mut group = ProcessorGroupConfig::default();

        if let Some(size) = parse_var(&lookup, ENV_POOL_SIZE)? {
            pool.size = size;
        }
        if let Some(workers) = parse_var(&lookup, ENV_WORKERS)? {
            group.workers = workers;
        }
        if let Some(pin) = parse_var(&lookup, ENV_PIN_CORES)? {
            group.pin_cores = pin;
        }
        if let Some(timeout) = parse_var(&lookup, ENV_STOP_TIMEOUT_MS)? {
            group.stop_timeout_ms = timeout;
        }

        let cfg = Self {
            pools: HashMap::from([("default".to_string(), pool)]),
            groups: HashMap::from([("default".to_string(), group)]),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<F, V>(lookup: &F, key: &str) -> Result<Option<V>, String>
where
    F: Fn(&str) -> Option<String>,
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| format!("{key}={raw:?} invalid: {e}"))
        })
        .transpose()
}
