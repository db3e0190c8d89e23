//! Clearing cell contents.

use super::{CellPlan, OperationKind, PlanCells};
use crate::selection::Selection;
use gridtx_store::{CellAddress, CellValue};

/// Empties every cell in a selection. Empty cells are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearOperation {
    selection: Selection,
}

impl ClearOperation {
    /// Creates the operation.
    #[must_use]
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }
}

impl PlanCells for ClearOperation {
    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Clear
    }

    fn plan(&self, _address: CellAddress, current: Option<&CellValue>) -> CellPlan {
        match current {
            Some(_) => CellPlan::Write(None),
            None => CellPlan::Skip,
        }
    }
}
