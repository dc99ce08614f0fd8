use std::sync::atomic::{AtomicU64, Ordering};

/// iterations left in a measurement phase, shared by all workers
#[derive(Debug)]
pub struct Budget {
    remaining: AtomicU64,
}

impl Budget {
    pub fn new(n: u64) -> Self {
        Self {
            remaining: AtomicU64::new(n),
        }
    }

    /// claims one iteration; false once the budget is exhausted
    #[inline]
    pub fn next(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    /// drains the budget so every worker stops at its next claim
    pub fn abort(&self) {
        self.remaining.store(0, Ordering::Relaxed);
    }
}
