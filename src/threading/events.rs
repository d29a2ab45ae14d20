//! Manual-reset signals shared between a controller and its worker thread.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A manual-reset event: once set, every waiter passes until it is reset.
///
/// Built on a `parking_lot` Mutex/Condvar pair; waiting never polls.
#[derive(Debug)]
pub struct Signal {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    /// Create a signal in the given state.
    #[must_use]
    pub const fn new(set: bool) -> Self {
        Self {
            state: Mutex::new(set),
            condvar: Condvar::new(),
        }
    }

    /// Set the signal and wake all waiters.
    pub fn set(&self) {
        let mut state = self.state.lock();
        *state = true;
        self.condvar.notify_all();
    }

    /// Clear the signal.
    pub fn reset(&self) {
        *self.state.lock() = false;
    }

    /// Current state without waiting.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.state.lock()
    }

    /// Wait until the signal is set or `timeout` elapses; `None` waits
    /// indefinitely. Returns whether the signal is set.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut state = self.state.lock();
        if *state {
            return true;
        }
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        match (timeout, deadline) {
            (Some(t), _) if t.is_zero() => false,
            (_, Some(deadline)) => {
                while !*state {
                    if self.condvar.wait_until(&mut state, deadline).timed_out() {
                        return *state;
                    }
                }
                true
            }
            _ => {
                while !*state {
                    self.condvar.wait(&mut state);
                }
                true
            }
        }
    }
}

/// The three signals that coordinate one worker thread.
#[derive(Debug)]
pub struct ThreadEvents {
    /// Set while the worker may run; cleared by `pause`.
    pub could_resume: Signal,
    /// Set once termination has been requested.
    pub should_stop: Signal,
    /// Set once the worker acknowledged termination (or was forced out).
    pub stopped: Signal,
}

impl ThreadEvents {
    /// Resumable, not stopping, not stopped.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            could_resume: Signal::new(true),
            should_stop: Signal::new(false),
            stopped: Signal::new(false),
        }
    }
}

impl Default for ThreadEvents {
    fn default() -> Self {
        Self::new()
    }
}
