//! Error types for pool and processor operations.

use thiserror::Error;

/// Errors produced while building or leasing from an [`ObjectPool`](crate::pooling::ObjectPool).
#[derive(Debug, Error)]
pub enum PoolError {
    /// Pool size was zero.
    #[error("pool size must be greater than zero")]
    InvalidSize,
    /// No factory and no default construction were configured.
    #[error("no factory configured and no default construction available for `{0}`")]
    MissingFactory(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The factory failed or panicked while creating an object.
    #[error("object construction failed: {0:#}")]
    Construction(#[source] anyhow::Error),
}

/// Errors produced when starting a [`Processor`](crate::threading::Processor).
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// `run` was called on a processor whose thread was already started.
    #[error("processor `{0}` is already started")]
    AlreadyStarted(String),
    /// The requested core does not exist on this machine.
    #[error("invalid affinity: core {core} requested, {available} cores available")]
    InvalidAffinity {
        /// Zero-based core requested.
        core: usize,
        /// Number of logical cores available.
        available: usize,
    },
    /// The OS refused to create the thread.
    #[error("failed to spawn thread for processor `{name}`: {source}")]
    Spawn {
        /// Processor name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for hooks, factories and worker procedures.
pub type AppResult<T> = Result<T, anyhow::Error>;
