//! Error types for gridtx core.

use crate::batch::BatchState;
use crate::types::BatchId;
use gridtx_store::{CellAddress, StoreError};
use thiserror::Error;

/// Result type for core operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur in batch processing and undo/redo.
///
/// Validation problems are deliberately absent: they are reported as a list
/// from `validate_batch` and inside failed commit results, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Cell store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No batch with this id is tracked by the processor.
    #[error("batch not found: {batch_id}")]
    BatchNotFound {
        /// The requested batch.
        batch_id: BatchId,
    },

    /// The batch has already been committed, rolled back, or cancelled.
    #[error("batch {batch_id} is not active (state: {state})")]
    InactiveBatch {
        /// The batch.
        batch_id: BatchId,
        /// Its terminal state.
        state: BatchState,
    },

    /// Two operations in one batch target the same cell.
    #[error(
        "cell conflict at {address} (key {}): already targeted by operation {existing_operation}",
        .address.key()
    )]
    CellConflict {
        /// The colliding address.
        address: CellAddress,
        /// Index of the operation that already owns the address.
        existing_operation: usize,
    },

    /// The batch would hold more operations than configured.
    #[error("batch size limit exceeded: at most {limit} operations per batch")]
    SizeLimitExceeded {
        /// Configured maximum operation count.
        limit: usize,
    },

    /// The batch would touch more cells than configured.
    #[error("cell limit exceeded: {projected} cells projected, limit is {limit}")]
    CellLimitExceeded {
        /// Configured maximum cell count.
        limit: usize,
        /// Cell count the batch would reach.
        projected: usize,
    },

    /// An operation was constructed with invalid options.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Why the operation is invalid.
        message: String,
    },

    /// An operation failed while executing.
    #[error("operation {index} ({description}) failed: {reason}")]
    OperationExecutionFailed {
        /// Index of the operation within its batch.
        index: usize,
        /// Description of the failed operation.
        description: String,
        /// Failure description.
        reason: String,
    },

    /// Restoring original values failed; the store may be inconsistent.
    #[error("rollback of {batch_id} failed for {} cell(s): {reason}", .failed_cells.len())]
    RollbackFailed {
        /// The batch being rolled back.
        batch_id: BatchId,
        /// Cells whose original value could not be restored.
        failed_cells: Vec<CellAddress>,
        /// First failure encountered.
        reason: String,
    },

    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,

    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The derived undo operation did not validate.
    #[error("undo validation failed: {message}")]
    UndoValidationFailed {
        /// Validation message.
        message: String,
    },

    /// The undo operation failed to execute.
    #[error("undo failed: {message}")]
    UndoExecutionFailed {
        /// Failure description.
        message: String,
    },

    /// The redo operation failed to execute.
    #[error("redo failed: {message}")]
    RedoExecutionFailed {
        /// Failure description.
        message: String,
    },
}

impl BatchError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an undo execution error.
    pub fn undo_failed(message: impl Into<String>) -> Self {
        Self::UndoExecutionFailed {
            message: message.into(),
        }
    }

    /// Creates a redo execution error.
    pub fn redo_failed(message: impl Into<String>) -> Self {
        Self::RedoExecutionFailed {
            message: message.into(),
        }
    }

    /// Returns true if the error leaves the cell store in an unknown state.
    ///
    /// Only a failed rollback qualifies; every other error is recoverable by
    /// the caller.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}
