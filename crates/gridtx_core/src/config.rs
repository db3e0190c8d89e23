//! Batch processor and history configuration.

use std::time::Duration;

/// Configuration for a [`crate::BatchProcessor`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of operations in one batch.
    pub max_operations_per_batch: usize,

    /// Maximum number of distinct cells one batch may touch.
    pub max_cells_per_batch: usize,

    /// Whether a failing operation rolls back the whole batch.
    ///
    /// When disabled, commits run in partial-commit mode: the failed
    /// operation's cells are restored and the remaining operations still run.
    pub auto_rollback_on_error: bool,

    /// Whether `commit_batch` runs `validate_batch` first.
    pub validate_before_execution: bool,

    /// Maximum age of an open batch, checked by `validate_batch`.
    pub batch_timeout: Duration,

    /// Accepted for compatibility; operations always run sequentially.
    pub enable_parallel_processing: bool,

    /// Accepted for compatibility; operations always run sequentially.
    pub worker_threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_operations_per_batch: 100,
            max_cells_per_batch: 1_000_000,
            auto_rollback_on_error: true,
            validate_before_execution: true,
            batch_timeout: Duration::from_secs(5 * 60),
            enable_parallel_processing: false,
            worker_threads: 4,
        }
    }
}

impl BatchConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum operation count per batch.
    #[must_use]
    pub const fn max_operations_per_batch(mut self, value: usize) -> Self {
        self.max_operations_per_batch = value;
        self
    }

    /// Sets the maximum distinct cell count per batch.
    #[must_use]
    pub const fn max_cells_per_batch(mut self, value: usize) -> Self {
        self.max_cells_per_batch = value;
        self
    }

    /// Sets whether a failing operation rolls back the whole batch.
    #[must_use]
    pub const fn auto_rollback_on_error(mut self, value: bool) -> Self {
        self.auto_rollback_on_error = value;
        self
    }

    /// Sets whether commits validate first.
    #[must_use]
    pub const fn validate_before_execution(mut self, value: bool) -> Self {
        self.validate_before_execution = value;
        self
    }

    /// Sets the open-batch timeout.
    #[must_use]
    pub const fn batch_timeout(mut self, value: Duration) -> Self {
        self.batch_timeout = value;
        self
    }

    /// Sets the advisory parallel processing flag.
    #[must_use]
    pub const fn enable_parallel_processing(mut self, value: bool) -> Self {
        self.enable_parallel_processing = value;
        self
    }

    /// Sets the advisory worker thread count.
    #[must_use]
    pub const fn worker_threads(mut self, value: usize) -> Self {
        self.worker_threads = value;
        self
    }
}

/// Configuration for an [`crate::UndoRedoManager`].
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of undo actions retained.
    ///
    /// The redo stack holds at most half as many (minimum one).
    pub max_history_size: usize,

    /// Whether recording also evicts actions older than `max_action_age`.
    pub auto_cleanup: bool,

    /// Age after which actions are evicted when `auto_cleanup` is on.
    pub max_action_age: Duration,

    /// Reserved. Stored but not used by the history algorithm.
    pub compress_actions: bool,

    /// Whether undo validates the derived operation before executing it.
    pub validate_undo: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: 100,
            auto_cleanup: true,
            max_action_age: Duration::from_secs(60 * 60),
            compress_actions: false,
            validate_undo: true,
        }
    }
}

impl HistoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum undo history size.
    #[must_use]
    pub const fn max_history_size(mut self, value: usize) -> Self {
        self.max_history_size = value;
        self
    }

    /// Sets whether recording evicts old actions.
    #[must_use]
    pub const fn auto_cleanup(mut self, value: bool) -> Self {
        self.auto_cleanup = value;
        self
    }

    /// Sets the maximum action age.
    #[must_use]
    pub const fn max_action_age(mut self, value: Duration) -> Self {
        self.max_action_age = value;
        self
    }

    /// Sets the reserved compression flag.
    #[must_use]
    pub const fn compress_actions(mut self, value: bool) -> Self {
        self.compress_actions = value;
        self
    }

    /// Sets whether undo validates before executing.
    #[must_use]
    pub const fn validate_undo(mut self, value: bool) -> Self {
        self.validate_undo = value;
        self
    }

    /// Maximum redo stack length derived from the history size.
    #[must_use]
    pub fn max_redo_size(&self) -> usize {
        (self.max_history_size / 2).max(1)
    }
}
