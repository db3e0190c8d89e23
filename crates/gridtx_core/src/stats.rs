//! Batch processor statistics.
//!
//! Counters are monotonically increasing for the life of a processor and can
//! be read at any time through [`crate::BatchProcessor::stats`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Batch processor counters.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    batches_started: AtomicU64,
    batches_committed: AtomicU64,
    batches_rolled_back: AtomicU64,
    batches_cancelled: AtomicU64,
    operations_executed: AtomicU64,
    operations_failed: AtomicU64,
    cells_modified: AtomicU64,
    rollback_failures: AtomicU64,
}

impl ProcessorStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_batch_start(&self) {
        self.batches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self, cells_modified: usize) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.cells_modified
            .fetch_add(cells_modified as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.batches_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancel(&self) {
        self.batches_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_operation(&self, succeeded: bool) {
        self.operations_executed.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.operations_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_rollback_failure(&self) {
        self.rollback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_started: self.batches_started.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            batches_rolled_back: self.batches_rolled_back.load(Ordering::Relaxed),
            batches_cancelled: self.batches_cancelled.load(Ordering::Relaxed),
            operations_executed: self.operations_executed.load(Ordering::Relaxed),
            operations_failed: self.operations_failed.load(Ordering::Relaxed),
            cells_modified: self.cells_modified.load(Ordering::Relaxed),
            rollback_failures: self.rollback_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`ProcessorStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Batches begun.
    pub batches_started: u64,
    /// Batches committed, including partial commits.
    pub batches_committed: u64,
    /// Batches whose original values were restored.
    pub batches_rolled_back: u64,
    /// Batches abandoned before commit.
    pub batches_cancelled: u64,
    /// Operations executed.
    pub operations_executed: u64,
    /// Operations that failed.
    pub operations_failed: u64,
    /// Cells modified by committed batches.
    pub cells_modified: u64,
    /// Rollbacks that could not restore every cell.
    pub rollback_failures: u64,
}
