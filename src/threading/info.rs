//! Per-processor configuration and synchronization state.

use std::sync::OnceLock;
use std::thread::ThreadId;

use serde::{Deserialize, Serialize};
use thread_priority::{ThreadPriority as OsPriority, ThreadPriorityValue};

use super::ThreadEvents;

/// Which cores a worker thread may run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    /// No restriction.
    #[default]
    AllCores,
    /// Pin to a single zero-based core.
    Core(usize),
}

impl Affinity {
    /// Legacy one-based core index: `0` means all cores, `n` means core `n - 1`.
    #[must_use]
    pub const fn from_core_index(core_index: usize) -> Self {
        match core_index {
            0 => Self::AllCores,
            n => Self::Core(n - 1),
        }
    }

    /// Affinity as a 64-bit mask. Cores beyond 63 have no bit and yield `0`.
    #[must_use]
    pub fn mask(self) -> u64 {
        match self {
            Self::AllCores => u64::MAX,
            Self::Core(core) => u32::try_from(core)
                .ok()
                .and_then(|shift| 1_u64.checked_shl(shift))
                .unwrap_or(0),
        }
    }
}

/// Scheduling priority requested for a worker thread.
///
/// Applied to the worker thread at startup on a best-effort basis. Lowering
/// priority is normally allowed; raising it usually needs privileges, and a
/// refusal is logged while the thread keeps running at its inherited priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadPriority {
    /// Lowest priority.
    Lowest,
    /// Below normal priority.
    BelowNormal,
    /// Normal priority.
    #[default]
    Normal,
    /// Above normal priority.
    AboveNormal,
    /// Highest priority.
    Highest,
}

impl ThreadPriority {
    /// OS priority to request, or `None` to keep the inherited one.
    pub(crate) fn to_os(self) -> Option<OsPriority> {
        match self {
            Self::Lowest => Some(OsPriority::Min),
            Self::BelowNormal => ThreadPriorityValue::try_from(25_u8)
                .ok()
                .map(OsPriority::Crossplatform),
            Self::Normal => None,
            Self::AboveNormal => ThreadPriorityValue::try_from(75_u8)
                .ok()
                .map(OsPriority::Crossplatform),
            Self::Highest => Some(OsPriority::Max),
        }
    }
}

/// Options for [`Processor::run`](super::Processor::run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Core restriction.
    pub affinity: Affinity,
    /// Requested priority.
    pub priority: ThreadPriority,
    /// Start with the may-resume signal cleared.
    pub start_paused: bool,
}

impl RunOptions {
    /// All cores, normal priority, running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the core restriction.
    #[must_use]
    pub const fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    /// Set the requested priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Start paused.
    #[must_use]
    pub const fn with_start_paused(mut self, start_paused: bool) -> Self {
        self.start_paused = start_paused;
        self
    }
}

/// Whether the procedure receives its processor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    /// `FnOnce(&ProcessorHandle)`.
    Single,
    /// `FnOnce(&ProcessorHandle, usize)`.
    Indexed,
}

#[derive(Debug, Clone, Copy)]
struct Launch {
    options: RunOptions,
    kind: ProcedureKind,
}

/// Identity, launch settings and signals of one processor.
///
/// Launch settings and the thread identity are written once, when the
/// processor starts, and are read-only afterwards.
#[derive(Debug)]
pub struct ProcessorInfo {
    name: String,
    index: usize,
    group: Option<u64>,
    events: ThreadEvents,
    launch: OnceLock<Launch>,
    thread_id: OnceLock<ThreadId>,
}

impl ProcessorInfo {
    pub(crate) const fn new(name: String, index: usize, group: Option<u64>) -> Self {
        Self {
            name,
            index,
            group,
            events: ThreadEvents::new(),
            launch: OnceLock::new(),
            thread_id: OnceLock::new(),
        }
    }

    /// Processor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index within the owning group (zero for standalone processors).
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Identifier of the owning [`Processors`](super::Processors) group.
    #[must_use]
    pub const fn group(&self) -> Option<u64> {
        self.group
    }

    /// Control signals.
    #[must_use]
    pub const fn events(&self) -> &ThreadEvents {
        &self.events
    }

    /// Affinity the processor was started with.
    #[must_use]
    pub fn affinity(&self) -> Option<Affinity> {
        self.launch.get().map(|l| l.options.affinity)
    }

    /// Priority the processor was started with.
    #[must_use]
    pub fn priority(&self) -> Option<ThreadPriority> {
        self.launch.get().map(|l| l.options.priority)
    }

    /// Kind of procedure the processor runs.
    #[must_use]
    pub fn procedure_kind(&self) -> Option<ProcedureKind> {
        self.launch.get().map(|l| l.kind)
    }

    /// Identity of the worker thread once started.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread_id.get().copied()
    }

    /// Whether `run` has successfully started the thread.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.launch.get().is_some()
    }

    pub(crate) fn set_launch(&self, options: RunOptions, kind: ProcedureKind) -> bool {
        self.launch.set(Launch { options, kind }).is_ok()
    }

    pub(crate) fn record_thread(&self, id: ThreadId) {
        let _ = self.thread_id.set(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_from_core_index() {
        assert_eq!(Affinity::from_core_index(0), Affinity::AllCores);
        assert_eq!(Affinity::from_core_index(1), Affinity::Core(0));
        assert_eq!(Affinity::from_core_index(4), Affinity::Core(3));
    }

    #[test]
    fn test_affinity_mask() {
        assert_eq!(Affinity::AllCores.mask(), u64::MAX);
        assert_eq!(Affinity::Core(0).mask(), 1);
        assert_eq!(Affinity::Core(3).mask(), 0b1000);
        assert_eq!(Affinity::Core(64).mask(), 0);
    }

    #[test]
    fn test_launch_set_once() {
        let info = ProcessorInfo::new("p".into(), 2, None);
        assert!(!info.is_started());
        assert!(info.affinity().is_none());

        let options = RunOptions::new().with_affinity(Affinity::Core(1));
        assert!(info.set_launch(options, ProcedureKind::Indexed));
        assert!(!info.set_launch(RunOptions::new(), ProcedureKind::Single));

        assert_eq!(info.affinity(), Some(Affinity::Core(1)));
        assert_eq!(info.procedure_kind(), Some(ProcedureKind::Indexed));
        assert_eq!(info.index(), 2);
    }

    #[test]
    fn test_priority_serde() {
        let json = serde_json::to_string(&ThreadPriority::AboveNormal).unwrap();
        assert_eq!(json, "\"above_normal\"");
        assert!(ThreadPriority::Highest > ThreadPriority::Normal);
    }

    #[test]
    fn test_priority_os_mapping() {
        assert_eq!(ThreadPriority::Normal.to_os(), None);
        assert_eq!(ThreadPriority::Lowest.to_os(), Some(OsPriority::Min));
        assert_eq!(ThreadPriority::Highest.to_os(), Some(OsPriority::Max));
        assert!(matches!(
            ThreadPriority::BelowNormal.to_os(),
            Some(OsPriority::Crossplatform(_))
        ));
    }
}
