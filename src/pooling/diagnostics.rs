//! Pool diagnostics counters.

use serde::{Deserialize, Serialize};

use super::Counter;

/// Counters tracking the events of one [`ObjectPool`](super::ObjectPool).
///
/// Every counter except `live` only grows. `live` is the number of objects
/// created and not yet destroyed, whether idle or leased.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub(crate) hits: Counter,
    pub(crate) misses: Counter,
    pub(crate) created: Counter,
    pub(crate) destroyed: Counter,
    pub(crate) returned: Counter,
    pub(crate) overflows: Counter,
    pub(crate) reset_failures: Counter,
    pub(crate) resurrections: Counter,
    pub(crate) live: Counter,
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    /// Leases served from an idle object.
    pub hits: i64,
    /// Leases that had to create a new object.
    pub misses: i64,
    /// Objects created, including pre-population.
    pub created: i64,
    /// Objects destroyed for any reason.
    pub destroyed: i64,
    /// Objects reset and re-queued.
    pub returned: i64,
    /// Objects destroyed because the pool was full on return.
    pub overflows: i64,
    /// Objects destroyed because their reset hook failed.
    pub reset_failures: i64,
    /// Returns triggered by scope exit rather than explicit disposal.
    pub resurrections: i64,
    /// Objects created and not yet destroyed.
    pub live: i64,
}

impl Diagnostics {
    /// Leases served from an idle object.
    pub const fn hits(&self) -> &Counter {
        &self.hits
    }

    /// Leases that had to create a new object.
    pub const fn misses(&self) -> &Counter {
        &self.misses
    }

    /// Objects created.
    pub const fn created(&self) -> &Counter {
        &self.created
    }

    /// Objects destroyed.
    pub const fn destroyed(&self) -> &Counter {
        &self.destroyed
    }

    /// Objects reset and re-queued.
    pub const fn returned(&self) -> &Counter {
        &self.returned
    }

    /// Objects destroyed on a full pool.
    pub const fn overflows(&self) -> &Counter {
        &self.overflows
    }

    /// Objects destroyed after a failed reset.
    pub const fn reset_failures(&self) -> &Counter {
        &self.reset_failures
    }

    /// Scope-exit returns.
    pub const fn resurrections(&self) -> &Counter {
        &self.resurrections
    }

    /// Objects currently alive.
    pub const fn live(&self) -> &Counter {
        &self.live
    }

    /// Get a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            hits: self.hits.value(),
            misses: self.misses.value(),
            created: self.created.value(),
            destroyed: self.destroyed.value(),
            returned: self.returned.value(),
            overflows: self.overflows.value(),
            reset_failures: self.reset_failures.value(),
            resurrections: self.resurrections.value(),
            live: self.live.value(),
        }
    }
}
