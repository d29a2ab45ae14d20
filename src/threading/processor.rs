//! A single controllable worker thread.
//!
//! A [`Processor`] owns one OS thread running a user procedure. Control is
//! cooperative: `pause`, `resume` and `stop` only flip signals, and the
//! procedure observes them at its own checkpoints through the
//! [`ProcessorHandle`] it receives.
//!
//! ```
//! use poolworks::threading::{Procedure, Processor, RunOptions};
//! use std::time::Duration;
//!
//! let processor = Processor::new("ticker", 0);
//! processor
//!     .run(
//!         RunOptions::new(),
//!         Procedure::single(|p| {
//!             while !p.should_stop(Some(Duration::from_millis(10))) {
//!                 p.could_resume(None);
//!             }
//!             Ok(p.finish(true))
//!         }),
//!     )
//!     .unwrap();
//!
//! processor.stop();
//! assert!(processor.wait_to_stop(Some(Duration::from_secs(5))));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::fault::panic_to_error;
use crate::core::{build_fault, fault_sink, AppResult, FaultSink, ProcessorError};

use super::{Affinity, ProcedureKind, ProcessorInfo, RunOptions, ThreadPriority};

type SingleProcedure = Box<dyn FnOnce(&ProcessorHandle) -> AppResult<bool> + Send>;
type IndexedProcedure = Box<dyn FnOnce(&ProcessorHandle, usize) -> AppResult<bool> + Send>;

/// The body of a worker thread.
///
/// The returned `bool` is the thread's result. An `Err` or a panic is
/// reported to the processor's fault sink and the thread ends.
pub enum Procedure {
    /// Receives only the processor handle.
    Single(SingleProcedure),
    /// Also receives the processor index within its group.
    Indexed(IndexedProcedure),
}

impl Procedure {
    /// Wrap a procedure that does not need its index.
    pub fn single<F>(procedure: F) -> Self
    where
        F: FnOnce(&ProcessorHandle) -> AppResult<bool> + Send + 'static,
    {
        Self::Single(Box::new(procedure))
    }

    /// Wrap a procedure that receives its index.
    pub fn indexed<F>(procedure: F) -> Self
    where
        F: FnOnce(&ProcessorHandle, usize) -> AppResult<bool> + Send + 'static,
    {
        Self::Indexed(Box::new(procedure))
    }

    /// Which variant this is.
    #[must_use]
    pub const fn kind(&self) -> ProcedureKind {
        match self {
            Self::Single(_) => ProcedureKind::Single,
            Self::Indexed(_) => ProcedureKind::Indexed,
        }
    }

    fn invoke(self, handle: &ProcessorHandle) -> AppResult<bool> {
        match self {
            Self::Single(procedure) => procedure(handle),
            Self::Indexed(procedure) => procedure(handle, handle.index()),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Procedure").field(&self.kind()).finish()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<ProcessorHandle>> = const { RefCell::new(None) };
}

/// Shared view of a processor, used by the worker procedure for its
/// cooperative checkpoints and by controllers for signaling.
#[derive(Clone)]
pub struct ProcessorHandle {
    info: Arc<ProcessorInfo>,
}

impl ProcessorHandle {
    /// The processor whose worker thread is calling, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Identity, launch settings and signals.
    #[must_use]
    pub fn info(&self) -> &ProcessorInfo {
        &self.info
    }

    /// Processor name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// Processor index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.info.index()
    }

    /// Block until the processor may resume or `timeout` elapses (`None`
    /// waits indefinitely). Returns whether it may resume.
    pub fn could_resume(&self, timeout: Option<Duration>) -> bool {
        self.info.events().could_resume.wait(timeout)
    }

    /// Block until a stop is requested or `timeout` elapses (`None` waits
    /// indefinitely). Returns whether the processor should stop.
    pub fn should_stop(&self, timeout: Option<Duration>) -> bool {
        self.info.events().should_stop.wait(timeout)
    }

    /// Acknowledge termination and pass `result` through.
    pub fn finish(&self, result: bool) -> bool {
        self.info.events().stopped.set();
        result
    }

    /// Clear the may-resume signal.
    pub fn pause(&self) {
        self.info.events().could_resume.reset();
    }

    /// Set the may-resume signal.
    pub fn resume(&self) {
        self.info.events().could_resume.set();
    }

    /// Request termination without waiting.
    pub fn stop(&self) {
        self.info.events().should_stop.set();
    }

    /// Whether the processor is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        !self.info.events().could_resume.is_set()
    }

    /// Whether termination was requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.info.events().should_stop.is_set()
    }

    /// Whether termination was acknowledged.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.info.events().stopped.is_set()
    }

    /// Sleep cooperatively for `timeout`.
    ///
    /// Returns `true` once the full period elapsed, `false` as soon as a stop
    /// is requested. Checks happen every `accuracy / 2`.
    pub fn wait_for(&self, timeout: Duration, accuracy: Duration) -> bool {
        self.wait_until(timeout, || false, accuracy)
    }

    /// Like [`wait_for`](Self::wait_for), also returning `false` early once
    /// `predicate` holds.
    pub fn wait_until<P>(&self, timeout: Duration, mut predicate: P, accuracy: Duration) -> bool
    where
        P: FnMut() -> bool,
    {
        let step = (accuracy / 2).max(Duration::from_millis(1));
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return true;
            }
            if self.stop_requested() || predicate() {
                return false;
            }
            if self.should_stop(Some(step.min(timeout - elapsed))) {
                return false;
            }
        }
    }

    /// Whether both handles refer to the same processor.
    #[must_use]
    pub fn same_processor(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.info, &other.info)
    }
}

impl fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("name", &self.name())
            .field("index", &self.index())
            .field("paused", &self.is_paused())
            .field("stop_requested", &self.stop_requested())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// How [`Processor::remove`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The worker acknowledged the stop in time (or never started).
    Stopped,
    /// The timeout elapsed; the thread was detached and may still be running.
    Detached,
}

impl RemoveOutcome {
    /// Whether the stop was cooperative.
    #[must_use]
    pub const fn is_graceful(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Owner of one worker thread.
///
/// Dropping a processor that is still running requests a stop and detaches
/// the thread; call [`remove`](Self::remove) for a bounded graceful stop.
pub struct Processor {
    handle: ProcessorHandle,
    thread: Mutex<Option<JoinHandle<bool>>>,
    fault_sink: Arc<dyn FaultSink>,
}

impl Processor {
    /// Create an idle processor reporting faults to the default sink.
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self::with_parts(name.into(), index, None, fault_sink())
    }

    pub(crate) fn with_parts(
        name: String,
        index: usize,
        group: Option<u64>,
        fault_sink: Arc<dyn FaultSink>,
    ) -> Self {
        Self {
            handle: ProcessorHandle {
                info: Arc::new(ProcessorInfo::new(name, index, group)),
            },
            thread: Mutex::new(None),
            fault_sink,
        }
    }

    /// Report worker faults to `sink` instead of the default.
    #[must_use]
    pub fn with_fault_sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.fault_sink = sink;
        self
    }

    /// Shared handle to this processor.
    #[must_use]
    pub const fn handle(&self) -> &ProcessorHandle {
        &self.handle
    }

    /// Identity, launch settings and signals.
    #[must_use]
    pub fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }

    /// Processor name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Processor index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.handle.index()
    }

    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// - `ProcessorError::AlreadyStarted` if the thread was started before
    /// - `ProcessorError::InvalidAffinity` if the core does not exist
    /// - `ProcessorError::Spawn` if the OS refused to create the thread
    ///
    /// Nothing is retained on failure; `run` may be retried.
    pub fn run(&self, options: RunOptions, procedure: Procedure) -> Result<(), ProcessorError> {
        let mut thread = self.thread.lock();
        let info = self.handle.info();
        if thread.is_some() || info.is_started() {
            return Err(ProcessorError::AlreadyStarted(info.name().to_string()));
        }
        if let Affinity::Core(core) = options.affinity {
            let available = num_cpus::get();
            if core >= available {
                return Err(ProcessorError::InvalidAffinity { core, available });
            }
        }

        if options.start_paused {
            info.events().could_resume.reset();
        }

        let kind = procedure.kind();
        let handle = self.handle.clone();
        let sink = Arc::clone(&self.fault_sink);
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", info.name(), info.index()))
            .spawn(move || worker_main(&handle, options, procedure, sink.as_ref()));

        match spawned {
            Ok(join) => {
                info.record_thread(join.thread().id());
                info.set_launch(options, kind);
                *thread = Some(join);
                info!(
                    processor = %info.name(),
                    index = info.index(),
                    affinity = ?options.affinity,
                    priority = ?options.priority,
                    start_paused = options.start_paused,
                    "processor started"
                );
                Ok(())
            }
            Err(source) => {
                if options.start_paused {
                    info.events().could_resume.set();
                }
                Err(ProcessorError::Spawn {
                    name: info.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Whether the thread was started and has not acknowledged a stop.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.info().is_started() && !self.handle.is_stopped()
    }

    /// Clear the may-resume signal.
    pub fn pause(&self) {
        self.handle.pause();
    }

    /// Set the may-resume signal.
    pub fn resume(&self) {
        self.handle.resume();
    }

    /// Request termination without waiting.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Wait for the stop acknowledgment (`None` waits indefinitely).
    ///
    /// Returns `true` immediately for a processor that was never started.
    pub fn wait_to_stop(&self, timeout: Option<Duration>) -> bool {
        if !self.info().is_started() {
            return true;
        }
        self.info().events().stopped.wait(timeout)
    }

    /// Request a stop and wait up to `timeout` for it.
    ///
    /// If the worker does not acknowledge in time it cannot be killed safely:
    /// its thread is detached and keeps running until the procedure returns
    /// on its own, without any cleanup guarantee. The stopped signal is set
    /// either way.
    pub fn remove(&self, timeout: Option<Duration>) -> RemoveOutcome {
        self.stop();
        let outcome = if self.wait_to_stop(timeout) {
            RemoveOutcome::Stopped
        } else {
            drop(self.thread.lock().take());
            warn!(
                processor = %self.name(),
                index = self.index(),
                timeout = ?timeout,
                "processor did not stop within timeout - detaching"
            );
            RemoveOutcome::Detached
        };
        self.info().events().stopped.set();
        debug!(processor = %self.name(), index = self.index(), outcome = ?outcome, "processor removed");
        outcome
    }

    /// Join the worker thread and return its result.
    ///
    /// Returns `None` if the thread was never started, was detached, or
    /// panicked outside the procedure. Blocks until the thread exits.
    pub fn join(&self) -> Option<bool> {
        let join = self.thread.lock().take()?;
        join.join().ok()
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("handle", &self.handle)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
            debug!(
                processor = %self.name(),
                index = self.index(),
                "processor dropped while running - stop requested, thread detached"
            );
        }
    }
}

fn worker_main(
    handle: &ProcessorHandle,
    options: RunOptions,
    procedure: Procedure,
    sink: &dyn FaultSink,
) -> bool {
    let info = handle.info();
    info.record_thread(thread::current().id());
    CURRENT.with(|current| *current.borrow_mut() = Some(handle.clone()));
    apply_affinity(info, options.affinity);
    apply_priority(info, options.priority);
    debug!(processor = %info.name(), index = info.index(), "processor thread running");

    let result = match catch_unwind(AssertUnwindSafe(|| procedure.invoke(handle))) {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            sink.report(build_fault(info.name(), &err));
            false
        }
        Err(payload) => {
            sink.report(build_fault(info.name(), &panic_to_error(payload.as_ref())));
            false
        }
    };

    info.events().stopped.set();
    CURRENT.with(|current| current.borrow_mut().take());
    debug!(processor = %info.name(), index = info.index(), result, "processor thread exiting");
    result
}

fn apply_affinity(info: &ProcessorInfo, affinity: Affinity) {
    let Affinity::Core(core) = affinity else {
        return;
    };
    let pinned = core_affinity::get_core_ids()
        .and_then(|ids| ids.into_iter().find(|id| id.id == core))
        .is_some_and(core_affinity::set_for_current);
    if !pinned {
        warn!(
            processor = %info.name(),
            core,
            "core pinning failed, running on all cores"
        );
    }
}

fn apply_priority(info: &ProcessorInfo, priority: ThreadPriority) {
    let Some(os_priority) = priority.to_os() else {
        return;
    };
    if let Err(err) = thread_priority::set_current_thread_priority(os_priority) {
        warn!(
            processor = %info.name(),
            priority = ?priority,
            error = ?err,
            "setting thread priority failed, keeping inherited priority"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InMemoryFaultSink;

    #[test]
    fn test_never_started_processor() {
        let processor = Processor::new("idle", 0);
        assert!(!processor.is_running());
        assert!(processor.wait_to_stop(Some(Duration::ZERO)));
        assert_eq!(processor.remove(Some(Duration::ZERO)), RemoveOutcome::Stopped);
        assert_eq!(processor.join(), None);
    }

    #[test]
    fn test_run_twice_fails() {
        let processor = Processor::new("twice", 0);
        processor
            .run(RunOptions::new(), Procedure::single(|p| Ok(p.finish(true))))
            .unwrap();
        let err = processor
            .run(RunOptions::new(), Procedure::single(|p| Ok(p.finish(true))))
            .unwrap_err();
        assert!(matches!(err, ProcessorError::AlreadyStarted(_)));
        assert_eq!(processor.join(), Some(true));
    }

    #[test]
    fn test_invalid_affinity_leaves_processor_idle() {
        let processor = Processor::new("pinned", 0);
        let options = RunOptions::new()
            .with_affinity(Affinity::Core(usize::MAX))
            .with_start_paused(true);
        let err = processor
            .run(options, Procedure::single(|_| Ok(true)))
            .unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidAffinity { .. }));
        assert!(!processor.info().is_started());
        assert!(!processor.handle().is_paused());
    }

    #[test]
    fn test_current_inside_and_outside_worker() {
        assert!(ProcessorHandle::current().is_none());
        let processor = Processor::new("current", 3);
        processor
            .run(
                RunOptions::new(),
                Procedure::indexed(|p, index| {
                    let current = ProcessorHandle::current().expect("inside worker");
                    Ok(current.same_processor(p) && index == 3)
                }),
            )
            .unwrap();
        assert_eq!(processor.join(), Some(true));
    }

    #[test]
    fn test_procedure_error_goes_to_sink() {
        let sink = Arc::new(InMemoryFaultSink::new(8));
        let processor = Processor::new("faulty", 0).with_fault_sink(sink.clone());
        processor
            .run(
                RunOptions::new(),
                Procedure::single(|_| Err(anyhow::anyhow!("disk on fire"))),
            )
            .unwrap();
        assert_eq!(processor.join(), Some(false));
        let faults = sink.faults();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].source, "faulty");
        assert_eq!(faults[0].message, "disk on fire");
        assert!(processor.handle().is_stopped());
    }

    #[test]
    fn test_wait_for_elapses() {
        let processor = Processor::new("sleeper", 0);
        let start = Instant::now();
        assert!(processor
            .handle()
            .wait_for(Duration::from_millis(40), Duration::from_millis(10)));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_wait_until_predicate() {
        let processor = Processor::new("sleeper", 0);
        let mut calls = 0;
        let lapsed = processor.handle().wait_until(
            Duration::from_secs(5),
            || {
                calls += 1;
                calls == 3
            },
            Duration::from_millis(2),
        );
        assert!(!lapsed);
        assert_eq!(calls, 3);
    }
}
