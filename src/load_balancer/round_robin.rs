//! Round-robin rotation counter.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared rotation state for a backend pool.
///
/// The counter is pre-incremented before indexing, so a fresh counter yields
/// position 1 first. It wraps on overflow; only `counter % len` is meaningful.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return the resulting position for `len` slots.
    pub fn next(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let count = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        Some(count % len)
    }

    /// Move the rotation to `index` so later selections start past it.
    pub fn advance_to(&self, index: usize) {
        self.counter.store(index, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }

    pub fn current(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}
