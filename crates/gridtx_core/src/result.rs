//! Operation and batch result contracts.
//!
//! These are the value objects handed to the UI/command layer. Every failure
//! path still produces a fully populated result, so callers can report which
//! operation and which cells were involved.

use crate::change::{CellChange, ChangeSet};
use crate::operation::OperationKind;
use crate::types::{now_millis, BatchId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and identity details attached to an [`OperationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Kind of operation that produced the result.
    pub operation_type: OperationKind,
    /// Start time, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    /// End time, milliseconds since the Unix epoch.
    pub finished_at_ms: u64,
    /// Processing throughput, 0.0 when nothing was processed.
    pub cells_per_second: f64,
}

/// Outcome of executing one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the operation completed.
    pub success: bool,
    /// Number of cells actually altered.
    pub cells_modified: usize,
    /// Number of cells visited, including skipped ones.
    pub cells_processed: usize,
    /// Wall-clock execution time.
    pub execution_time: Duration,
    /// Errors, in the order they occurred.
    pub errors: Vec<String>,
    /// Warnings, in the order they occurred.
    pub warnings: Vec<String>,
    /// Faithful record of every altered cell.
    pub actual_changes: ChangeSet,
    /// Timing and identity details.
    pub metadata: OperationMetadata,
}

impl OperationResult {
    /// Creates a zero-effect failed result.
    #[must_use]
    pub fn failed(operation_type: OperationKind, errors: Vec<String>) -> Self {
        let now = now_millis();
        Self {
            success: false,
            cells_modified: 0,
            cells_processed: 0,
            execution_time: Duration::ZERO,
            errors,
            warnings: Vec::new(),
            actual_changes: ChangeSet::new(),
            metadata: OperationMetadata {
                operation_type,
                started_at_ms: now,
                finished_at_ms: now,
                cells_per_second: 0.0,
            },
        }
    }

    /// Returns the change recorded for the cell with address key `key` (`"row,col"`).
    #[must_use]
    pub fn change_at_key(&self, key: &str) -> Option<&CellChange> {
        key.parse().ok().and_then(|addr| self.actual_changes.get(&addr))
    }
}

/// Aggregate outcome of one batch commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperationResult {
    /// The committed batch.
    pub batch_id: BatchId,
    /// Whether every operation succeeded.
    pub success: bool,
    /// Results of the operations that ran, in execution order.
    pub operation_results: Vec<OperationResult>,
    /// Number of operations registered in the batch.
    pub operation_count: usize,
    /// Cells modified across the batch; 0 after a rollback.
    pub total_cells_modified: usize,
    /// Wall-clock time of the whole commit.
    pub total_execution_time: Duration,
    /// Whether original values were restored.
    pub was_rolled_back: bool,
    /// Batch-level errors (validation problems, failed operations).
    pub batch_errors: Vec<String>,
    /// Per-cell changes merged across operations; later operations win.
    pub consolidated_changes: ChangeSet,
}

impl BatchOperationResult {
    /// Creates a failed result with no executed operations.
    pub(crate) fn rejected(
        batch_id: BatchId,
        operation_count: usize,
        batch_errors: Vec<String>,
    ) -> Self {
        Self {
            batch_id,
            success: false,
            operation_results: Vec::new(),
            operation_count,
            total_cells_modified: 0,
            total_execution_time: Duration::ZERO,
            was_rolled_back: false,
            batch_errors,
            consolidated_changes: ChangeSet::new(),
        }
    }

    /// Returns the consolidated change for address key `key` (`"row,col"`).
    #[must_use]
    pub fn change_at_key(&self, key: &str) -> Option<&CellChange> {
        key.parse()
            .ok()
            .and_then(|addr| self.consolidated_changes.get(&addr))
    }
}

/// Prospective outcome of an operation, computed without writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPreview {
    /// Sample of the changes that would be made, row-major.
    pub changes: Vec<CellChange>,
    /// Number of samples in `changes`.
    pub preview_count: usize,
    /// Number of changes that would be made in total.
    pub total_changes: usize,
    /// Whether `changes` was capped below `total_changes`.
    pub is_truncated: bool,
    /// Cells that would be altered.
    pub cells_modified: usize,
    /// Cells that would be left as they are.
    pub cells_skipped: usize,
    /// Altered cells that would receive a formula.
    pub formula_cells: usize,
    /// Altered cells that would receive a literal or be cleared.
    pub value_cells: usize,
    /// Warnings that would apply on execution.
    pub warnings: Vec<String>,
    /// Errors that would apply on execution.
    pub errors: Vec<String>,
    /// Estimated execution time.
    pub estimated_time: Duration,
}

/// Prospective outcome of a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPreview {
    /// The previewed batch.
    pub batch_id: BatchId,
    /// One preview per operation, in registration order.
    pub operation_previews: Vec<OperationPreview>,
    /// Cells that would be altered across the batch.
    pub total_cells_modified: usize,
    /// Cells that would be skipped across the batch.
    pub total_cells_skipped: usize,
    /// Sum of operation estimates.
    pub estimated_time: Duration,
    /// Problems `validate_batch` reports right now.
    pub validation_errors: Vec<String>,
}

impl BatchPreview {
    /// Returns true if the batch would commit without validation problems.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.validation_errors.is_empty()
            && self.operation_previews.iter().all(|p| p.errors.is_empty())
    }
}
