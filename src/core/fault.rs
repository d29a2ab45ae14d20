//! Fault sinks.
//!
//! Faults that must not be propagated to an unrelated caller (a worker
//! procedure that returned an error or panicked, for example) are handed to a
//! [`FaultSink`] instead. The default sink logs through `tracing`; tests use
//! [`InMemoryFaultSink`] to observe what was reported.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::error;
use uuid::Uuid;

use crate::util::clock::now_ms;

/// A reported fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Unique fault identifier.
    pub id: String,
    /// Component that reported the fault (processor or pool name).
    pub source: String,
    /// Rendered error chain.
    pub message: String,
    /// Timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
}

/// Receiver for faults raised by pools and processors.
pub trait FaultSink: Send + Sync {
    /// Record a fault. Must not panic.
    fn report(&self, fault: Fault);
}

/// Sink that logs every fault at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
    fn report(&self, fault: Fault) {
        error!(
            fault_id = %fault.id,
            source = %fault.source,
            "{}",
            fault.message
        );
    }
}

/// In-memory sink with a bounded buffer, for tests and development.
#[derive(Debug)]
pub struct InMemoryFaultSink {
    faults: Mutex<VecDeque<Fault>>,
    max_faults: usize,
}

impl InMemoryFaultSink {
    /// Create a sink that keeps at most `max_faults` entries, dropping the oldest.
    #[must_use]
    pub fn new(max_faults: usize) -> Self {
        Self {
            faults: Mutex::new(VecDeque::with_capacity(max_faults)),
            max_faults,
        }
    }

    /// Snapshot of stored faults, oldest first.
    #[must_use]
    pub fn faults(&self) -> Vec<Fault> {
        self.faults.lock().iter().cloned().collect()
    }

    /// Number of stored faults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faults.lock().len()
    }

    /// Whether no fault has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faults.lock().is_empty()
    }
}

impl FaultSink for InMemoryFaultSink {
    fn report(&self, fault: Fault) {
        let mut faults = self.faults.lock();
        if self.max_faults == 0 {
            return;
        }
        if faults.len() >= self.max_faults {
            faults.pop_front();
        }
        faults.push_back(fault);
    }
}

static DEFAULT_SINK: OnceLock<Arc<dyn FaultSink>> = OnceLock::new();

/// Install the process-wide default sink.
///
/// Only the first call wins; returns `false` if a sink was already installed
/// (or the default was already resolved by [`fault_sink`]).
pub fn install_fault_sink(sink: Arc<dyn FaultSink>) -> bool {
    DEFAULT_SINK.set(sink).is_ok()
}

/// The process-wide default sink, falling back to [`TracingFaultSink`].
#[must_use]
pub fn fault_sink() -> Arc<dyn FaultSink> {
    Arc::clone(DEFAULT_SINK.get_or_init(|| Arc::new(TracingFaultSink)))
}

/// Build a fault record from an error.
pub fn build_fault(source: impl Into<String>, err: &anyhow::Error) -> Fault {
    Fault {
        id: Uuid::new_v4().to_string(),
        source: source.into(),
        message: format!("{err:#}"),
        created_at_ms: now_ms(),
    }
}

/// Report an error to the process-wide default sink.
pub fn report_fault(source: impl Into<String>, err: &anyhow::Error) {
    fault_sink().report(build_fault(source, err));
}

/// Convert a panic payload into an error.
pub(crate) fn panic_to_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("panicked: {message}")
}
