//! Recorded undoable actions.

use crate::change::ChangeSet;
use crate::operation::{BulkOperation, OperationKind};
use crate::types::{now_millis, ActionId};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// One reversible entry in the history.
///
/// Holds the recorded changes and the operation that reverses them. The
/// original operation is kept as `redo_operation` when it can be re-run
/// as-is; otherwise redo is derived from `changes`.
#[derive(Debug, Clone)]
pub struct UndoAction {
    id: ActionId,
    operation_type: OperationKind,
    description: String,
    timestamp_ms: u64,
    recorded_at: Instant,
    undo_operation: BulkOperation,
    redo_operation: Option<BulkOperation>,
    changes: ChangeSet,
    metadata: BTreeMap<String, String>,
}

impl UndoAction {
    pub(crate) fn new(
        operation_type: OperationKind,
        description: String,
        undo_operation: BulkOperation,
        redo_operation: Option<BulkOperation>,
        changes: ChangeSet,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: ActionId::new(),
            operation_type,
            description,
            timestamp_ms: now_millis(),
            recorded_at: Instant::now(),
            undo_operation,
            redo_operation,
            changes,
            metadata,
        }
    }

    /// Returns the action ID.
    #[must_use]
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Kind of the operation that produced the changes.
    #[must_use]
    pub fn operation_type(&self) -> OperationKind {
        self.operation_type
    }

    /// Human-readable label, e.g. for an "Undo ..." menu entry.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Recording time, milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Time since the action was recorded.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.recorded_at.elapsed()
    }

    pub(crate) fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.recorded_at)
    }

    /// The operation that reverses the changes.
    #[must_use]
    pub fn undo_operation(&self) -> &BulkOperation {
        &self.undo_operation
    }

    /// The original operation, if it can be re-run for redo.
    #[must_use]
    pub fn redo_operation(&self) -> Option<&BulkOperation> {
        self.redo_operation.as_ref()
    }

    /// The recorded changes.
    #[must_use]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Free-form metadata.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}
