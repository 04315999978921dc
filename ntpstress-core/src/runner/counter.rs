use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome tally for a single burst. A fresh counter is created per burst.
#[derive(Debug, Default)]
pub struct BurstCounter {
    attempted: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub attempted: u64,
    pub failed: u64,
}

impl BurstCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, success: bool) {
        // `failed` is bumped first so a reader never sees failed > attempted.
        if !success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.attempted.fetch_add(1, Ordering::Release);
    }

    /// Consistent only once every recorder has returned.
    pub fn snapshot(&self) -> CounterSnapshot {
        let attempted = self.attempted.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Relaxed);
        CounterSnapshot { attempted, failed }
    }
}
