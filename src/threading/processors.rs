//! Named groups of processors with bulk control.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::ProcessorGroupConfig;
use crate::core::{fault_sink, AppResult, FaultSink, ProcessorError};

use super::{Procedure, Processor, ProcessorHandle, RemoveOutcome, RunOptions};

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// A named, ordered collection of [`Processor`]s.
///
/// Bulk operations broadcast to the members present when they are called and
/// are not atomic with respect to concurrent `add`.
pub struct Processors {
    id: u64,
    name: String,
    members: Mutex<Vec<Processor>>,
    fault_sink: Arc<dyn FaultSink>,
}

impl Processors {
    /// Create an empty group reporting faults to the default sink.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            members: Mutex::new(Vec::new()),
            fault_sink: fault_sink(),
        }
    }

    /// Report member faults to `sink` instead of the default.
    #[must_use]
    pub fn with_fault_sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.fault_sink = sink;
        self
    }

    /// Build a group of `config.workers` processors all running `procedure`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProcessorError`] raised while starting a member;
    /// members started before it are stopped when the group is dropped.
    pub fn from_config<F>(
        name: impl Into<String>,
        config: &ProcessorGroupConfig,
        procedure: F,
    ) -> Result<Self, ProcessorError>
    where
        F: Fn(&ProcessorHandle, usize) -> AppResult<bool> + Send + Sync + 'static,
    {
        Self::new(name).start_members(config, procedure)
    }

    /// Like [`from_config`](Self::from_config) for a group already carrying
    /// its fault sink.
    ///
    /// # Errors
    ///
    /// See [`from_config`](Self::from_config).
    pub fn start_members<F>(self, config: &ProcessorGroupConfig, procedure: F) -> Result<Self, ProcessorError>
    where
        F: Fn(&ProcessorHandle, usize) -> AppResult<bool> + Send + Sync + 'static,
    {
        let procedure = Arc::new(procedure);
        for index in 0..config.workers {
            let procedure = Arc::clone(&procedure);
            self.add(config.run_options(index), move |p, i| procedure(p, i))?;
        }
        info!(group = %self.name, workers = config.workers, "processor group started");
        Ok(self)
    }

    /// Start a new member running `procedure` and append it.
    ///
    /// The member's index is the group size at the time of the call. On
    /// failure the group is unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the [`ProcessorError`] from [`Processor::run`].
    pub fn add<F>(&self, options: RunOptions, procedure: F) -> Result<ProcessorHandle, ProcessorError>
    where
        F: FnOnce(&ProcessorHandle, usize) -> AppResult<bool> + Send + 'static,
    {
        let mut members = self.members.lock();
        let index = members.len();
        let processor = Processor::with_parts(
            format!("{}-{index}", self.name),
            index,
            Some(self.id),
            Arc::clone(&self.fault_sink),
        );
        processor.run(options, Procedure::indexed(procedure))?;
        let handle = processor.handle().clone();
        members.push(processor);
        debug!(group = %self.name, index, "processor added to group");
        Ok(handle)
    }

    /// The calling worker thread's processor, if it is a member of this group.
    #[must_use]
    pub fn current(&self) -> Option<ProcessorHandle> {
        let current = ProcessorHandle::current()?;
        if current.info().group() != Some(self.id) {
            return None;
        }
        self.members
            .lock()
            .iter()
            .any(|member| member.handle().same_processor(&current))
            .then_some(current)
    }

    /// Pause every member.
    pub fn pause_all(&self) {
        self.members.lock().iter().for_each(Processor::pause);
    }

    /// Resume every member.
    pub fn resume_all(&self) {
        self.members.lock().iter().for_each(Processor::resume);
    }

    /// Request a stop from every member without waiting.
    pub fn stop_all(&self) {
        self.members.lock().iter().for_each(Processor::stop);
    }

    /// Remove every member, stopping each with `timeout` in turn.
    ///
    /// Members are taken out under the group lock and stopped after it is
    /// released, so a worker calling [`current`](Self::current) while the
    /// group shuts down does not block the shutdown.
    pub fn remove_all(&self, timeout: Option<Duration>) -> Vec<RemoveOutcome> {
        let members = std::mem::take(&mut *self.members.lock());
        members.iter().for_each(Processor::stop);
        let outcomes: Vec<_> = members.iter().map(|member| member.remove(timeout)).collect();
        info!(
            group = %self.name,
            removed = outcomes.len(),
            detached = outcomes.iter().filter(|o| !o.is_graceful()).count(),
            "processor group cleared"
        );
        outcomes
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique group identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Handles of all members, in index order.
    #[must_use]
    pub fn handles(&self) -> Vec<ProcessorHandle> {
        self.members
            .lock()
            .iter()
            .map(|member| member.handle().clone())
            .collect()
    }
}

impl fmt::Debug for Processors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processors")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("members", &self.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Processors {
    fn drop(&mut self) {
        self.members.get_mut().iter().for_each(Processor::stop);
    }
}
