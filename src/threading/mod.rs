//! Controllable worker threads.
//!
//! A [`Processor`] wraps one OS thread whose procedure cooperates with
//! pause, resume and stop signals; [`Processors`] groups them under a name
//! with bulk control.

pub mod events;
pub mod info;
pub mod processor;
pub mod processors;

pub use events::{Signal, ThreadEvents};
pub use info::{Affinity, ProcedureKind, ProcessorInfo, RunOptions, ThreadPriority};
pub use processor::{Procedure, Processor, ProcessorHandle, RemoveOutcome};
pub use processors::Processors;
