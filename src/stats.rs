//! Aggregate usage counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every call issued through one client. Updated with
/// relaxed atomics; exact cross-counter consistency is not promised.
#[derive(Debug, Default)]
pub(crate) struct ClientStats {
    attempts: AtomicU64,
    retries: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl ClientStats {
    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Read-only view of a client's usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// HTTP attempts issued, retries included.
    pub attempts: u64,
    /// Attempts that were retried after a transient failure.
    pub retries: u64,
    /// Logical calls that returned successfully.
    pub successes: u64,
    /// Logical calls that failed.
    pub failures: u64,
}
