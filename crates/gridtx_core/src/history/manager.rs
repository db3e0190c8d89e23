//! Undo/redo manager.
//!
//! Keeps bounded undo and redo stacks of [`UndoAction`]s and derives each
//! inverse from recorded cell changes.

use super::action::UndoAction;
use crate::change::{CellChange, ChangeSet};
use crate::config::HistoryConfig;
use crate::error::{BatchError, BatchResult};
use crate::operation::{
    BulkOperation, OperationKind, ReplayDirection, ReplayOperation, SetValueOptions,
};
use crate::result::{BatchOperationResult, OperationResult};
use crate::selection::Selection;
use crate::types::ActionId;
use gridtx_store::{CellStore, CellValue};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bounded undo/redo history over recorded cell changes.
///
/// Both stacks keep the newest action at the back. Recording a new action
/// clears the redo stack; the undo stack is capped at `max_history_size`
/// and the redo stack at half of that (at least one), oldest evicted first.
pub struct UndoRedoManager {
    undo_stack: VecDeque<UndoAction>,
    redo_stack: VecDeque<UndoAction>,
    config: HistoryConfig,
}

impl UndoRedoManager {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        if config.compress_actions {
            debug!("action compression requested; actions are stored uncompressed");
        }
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Records a single executed operation.
    ///
    /// Returns `None` without touching the history when the result failed
    /// or modified nothing.
    pub fn record_action(
        &mut self,
        operation: &BulkOperation,
        result: &OperationResult,
    ) -> Option<ActionId> {
        if !result.success || result.actual_changes.is_empty() {
            debug!(success = result.success, "nothing to record");
            return None;
        }
        let action = UndoAction::new(
            operation.kind(),
            operation.description(),
            Self::derive_undo_operation(&result.actual_changes),
            reusable(operation),
            result.actual_changes.clone(),
            BTreeMap::new(),
        );
        Some(self.push_action(action))
    }

    /// Records a committed batch as one action.
    ///
    /// `operations` are the batch's operations in registration order.
    /// Partially committed and rolled-back batches are not recorded.
    pub fn record_batch_action(
        &mut self,
        operations: &[BulkOperation],
        result: &BatchOperationResult,
    ) -> Option<ActionId> {
        if !result.success || result.consolidated_changes.is_empty() {
            debug!(
                batch_id = %result.batch_id,
                success = result.success,
                "nothing to record"
            );
            return None;
        }

        let (kind, description, redo) = match operations {
            [single] => (single.kind(), single.description(), reusable(single)),
            _ => (
                OperationKind::Batch,
                format!(
                    "Batch of {} operations ({} cell(s))",
                    operations.len(),
                    result.consolidated_changes.len()
                ),
                None,
            ),
        };
        let metadata = BTreeMap::from([("batch_id".to_string(), result.batch_id.to_string())]);
        let action = UndoAction::new(
            kind,
            description,
            Self::derive_undo_operation(&result.consolidated_changes),
            redo,
            result.consolidated_changes.clone(),
            metadata,
        );
        Some(self.push_action(action))
    }

    fn push_action(&mut self, action: UndoAction) -> ActionId {
        let id = action.id();
        debug!(action_id = %id, "{}", action.description());

        self.redo_stack.clear();
        self.undo_stack.push_back(action);
        trim(&mut self.undo_stack, self.config.max_history_size);
        if self.config.auto_cleanup {
            self.evict_expired_at(Instant::now());
        }
        id
    }

    /// Derives the operation that restores every `before` value in `changes`.
    #[must_use]
    pub fn derive_undo_operation(changes: &ChangeSet) -> BulkOperation {
        derive_inverse(changes, ReplayDirection::Undo)
    }

    /// Derives the operation that re-applies every `after` value in `changes`.
    #[must_use]
    pub fn derive_redo_operation(changes: &ChangeSet) -> BulkOperation {
        derive_inverse(changes, ReplayDirection::Redo)
    }

    /// Reverts the most recent action.
    ///
    /// On failure the action stays on the undo stack. An execution error can
    /// leave some cells reverted; retrying the undo drives them all to their
    /// recorded values.
    ///
    /// # Errors
    ///
    /// `NothingToUndo`, `UndoValidationFailed` or `UndoExecutionFailed`.
    pub fn undo(&mut self, store: &mut dyn CellStore) -> BatchResult<OperationResult> {
        let action = self.undo_stack.pop_back().ok_or(BatchError::NothingToUndo)?;

        if self.config.validate_undo {
            if let Some(message) = action.undo_operation().validate() {
                warn!(action_id = %action.id(), "undo validation failed: {message}");
                self.undo_stack.push_back(action);
                return Err(BatchError::UndoValidationFailed { message });
            }
        }

        let outcome = action.undo_operation().execute(store);
        let message = match outcome {
            Ok(result) if result.success => {
                info!(
                    action_id = %action.id(),
                    cells = result.cells_modified,
                    "undid {}",
                    action.description()
                );
                self.redo_stack.push_back(action);
                trim(&mut self.redo_stack, self.config.max_redo_size());
                return Ok(result);
            }
            Ok(result) => result.errors.join("; "),
            Err(err) => err.to_string(),
        };
        warn!(action_id = %action.id(), "undo failed: {message}");
        self.undo_stack.push_back(action);
        Err(BatchError::undo_failed(message))
    }

    /// Re-applies the most recently undone action.
    ///
    /// Re-runs the original operation when it was kept, otherwise replays the
    /// recorded `after` values. On failure the action stays on the redo stack.
    ///
    /// # Errors
    ///
    /// `NothingToRedo` or `RedoExecutionFailed`.
    pub fn redo(&mut self, store: &mut dyn CellStore) -> BatchResult<OperationResult> {
        let action = self.redo_stack.pop_back().ok_or(BatchError::NothingToRedo)?;

        let outcome = match action.redo_operation() {
            Some(operation) => operation.execute(store),
            None => Self::derive_redo_operation(action.changes()).execute(store),
        };
        let message = match outcome {
            Ok(result) if result.success => {
                info!(
                    action_id = %action.id(),
                    cells = result.cells_modified,
                    "redid {}",
                    action.description()
                );
                self.undo_stack.push_back(action);
                trim(&mut self.undo_stack, self.config.max_history_size);
                return Ok(result);
            }
            Ok(result) => result.errors.join("; "),
            Err(err) => err.to_string(),
        };
        warn!(action_id = %action.id(), "redo failed: {message}");
        self.redo_stack.push_back(action);
        Err(BatchError::redo_failed(message))
    }

    /// Checks if there is an action to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Checks if there is an action to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Empties both stacks.
    pub fn clear(&mut self) {
        let dropped = self.undo_stack.len() + self.redo_stack.len();
        self.undo_stack.clear();
        self.redo_stack.clear();
        debug!(dropped, "history cleared");
    }

    /// Description of the action `undo` would revert.
    #[must_use]
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(UndoAction::description)
    }

    /// Description of the action `redo` would re-apply.
    #[must_use]
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(UndoAction::description)
    }

    /// Number of undoable actions.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable actions.
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Undoable actions, newest first.
    pub fn undo_actions(&self) -> impl Iterator<Item = &UndoAction> + '_ {
        self.undo_stack.iter().rev()
    }

    /// Redoable actions, newest first.
    pub fn redo_actions(&self) -> impl Iterator<Item = &UndoAction> + '_ {
        self.redo_stack.iter().rev()
    }

    /// Drops actions older than `max_action_age` from both stacks.
    ///
    /// Runs automatically on every record when `auto_cleanup` is set.
    /// Returns the number of dropped actions.
    pub fn evict_expired(&mut self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub(crate) fn evict_expired_at(&mut self, now: Instant) -> usize {
        let max_age = self.config.max_action_age;
        let before = self.undo_stack.len() + self.redo_stack.len();
        self.undo_stack.retain(|a| a.age_at(now) <= max_age);
        self.redo_stack.retain(|a| a.age_at(now) <= max_age);
        let evicted = before - self.undo_stack.len() - self.redo_stack.len();
        if evicted > 0 {
            debug!(evicted, "expired history actions evicted");
        }
        evicted
    }
}

impl Default for UndoRedoManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl fmt::Debug for UndoRedoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedoManager")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Keeps the original operation for redo unless it is itself a replay.
fn reusable(operation: &BulkOperation) -> Option<BulkOperation> {
    match operation {
        BulkOperation::Replay(_) => None,
        other => Some(other.clone()),
    }
}

fn trim(stack: &mut VecDeque<UndoAction>, max: usize) {
    while stack.len() > max {
        stack.pop_front();
    }
}

fn derive_inverse(changes: &ChangeSet, direction: ReplayDirection) -> BulkOperation {
    let target = |change: &CellChange| -> Option<CellValue> {
        match direction {
            ReplayDirection::Undo => change.inverted().after().cloned(),
            ReplayDirection::Redo => change.after().cloned(),
        }
    };

    let mut targets = changes.values().map(target);
    let uniform = match targets.next() {
        Some(first) if targets.all(|t| t == first) => Some(first),
        _ => None,
    };

    let selection: Selection = changes.keys().copied().collect();
    match uniform {
        Some(None) => BulkOperation::clear(selection),
        Some(Some(value)) => {
            let options = SetValueOptions::new(value).overwrite_existing(true);
            BulkOperation::set_value(selection, options).unwrap_or_else(|_| {
                BulkOperation::Replay(ReplayOperation::new(changes.clone(), direction))
            })
        }
        None => BulkOperation::Replay(ReplayOperation::new(changes.clone(), direction)),
    }
}
