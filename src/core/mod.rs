//! Error types and the fault sink shared by pools and processors.

pub mod error;
pub mod fault;

pub use error::{AppResult, PoolError, ProcessorError};
pub use fault::{
    build_fault, fault_sink, install_fault_sink, report_fault, Fault, FaultSink,
    InMemoryFaultSink, TracingFaultSink,
};
