//! Replaying recorded changes.

use super::{CellPlan, OperationKind, PlanCells};
use crate::change::ChangeSet;
use crate::selection::Selection;
use gridtx_store::{CellAddress, CellValue};

/// Which side of a recorded change a replay drives cells to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayDirection {
    /// Restore each cell's `before` value.
    Undo,
    /// Re-apply each cell's `after` value.
    Redo,
}

/// Drives every recorded cell to its own before- or after-value.
///
/// Used by the history when a change set is not uniform enough to be
/// expressed as a single set-value or clear.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOperation {
    changes: ChangeSet,
    direction: ReplayDirection,
    selection: Selection,
}

impl ReplayOperation {
    pub(crate) fn new(changes: ChangeSet, direction: ReplayDirection) -> Self {
        let selection = changes.keys().copied().collect();
        Self {
            changes,
            direction,
            selection,
        }
    }

    /// Replay direction.
    #[must_use]
    pub fn direction(&self) -> ReplayDirection {
        self.direction
    }

    /// The recorded changes being replayed.
    #[must_use]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }
}

impl PlanCells for ReplayOperation {
    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn kind(&self) -> OperationKind {
        match self.direction {
            ReplayDirection::Undo => OperationKind::UndoReplay,
            ReplayDirection::Redo => OperationKind::RedoReplay,
        }
    }

    fn plan(&self, address: CellAddress, _current: Option<&CellValue>) -> CellPlan {
        let Some(change) = self.changes.get(&address) else {
            return CellPlan::Skip;
        };
        let target = match self.direction {
            ReplayDirection::Undo => change.before(),
            ReplayDirection::Redo => change.after(),
        };
        CellPlan::Write(target.cloned())
    }
}
