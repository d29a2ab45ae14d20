//! Atomic diagnostic counter.

use std::sync::atomic::{AtomicI64, Ordering};

/// An atomically incremented/decremented integer used for diagnostics only.
///
/// Updates are `Relaxed`: counters are observational and impose no ordering
/// on the queue operation they accompany.
#[derive(Debug, Default)]
pub struct Counter(AtomicI64);

impl Counter {
    /// Create a counter starting at `value`.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(AtomicI64::new(value))
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Increment and return the new value.
    pub fn increment(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement and return the new value.
    pub fn decrement(&self) -> i64 {
        self.0.fetch_sub(1, Ordering::Relaxed) - 1
    }
}

impl From<&Counter> for i64 {
    fn from(counter: &Counter) -> Self {
        counter.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter_increment_decrement() {
        let counter = Counter::new(5);
        assert_eq!(counter.increment(), 6);
        assert_eq!(counter.decrement(), 5);
        assert_eq!(counter.decrement(), 4);
        assert_eq!(i64::from(&counter), 4);
    }

    #[test]
    fn test_counter_concurrent_increments() {
        let counter = Arc::new(Counter::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.value(), 8000);
    }
}
