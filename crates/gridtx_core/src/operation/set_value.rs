//! Literal and formula writes across a selection.

use super::{CellPlan, OperationKind, PlanCells};
use crate::error::{BatchError, BatchResult};
use crate::selection::Selection;
use gridtx_store::{CellAddress, CellValue};
use serde::{Deserialize, Serialize};

/// Options for a [`SetValueOperation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValueOptions {
    /// Value written to every selected cell.
    pub value: CellValue,
    /// Whether cells that already hold a value are overwritten.
    pub overwrite_existing: bool,
}

impl SetValueOptions {
    /// Creates options that only fill empty cells.
    #[must_use]
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            overwrite_existing: false,
        }
    }

    /// Sets whether existing values are overwritten.
    #[must_use]
    pub fn overwrite_existing(mut self, value: bool) -> Self {
        self.overwrite_existing = value;
        self
    }
}

/// Writes one value across a selection.
///
/// Without `overwrite_existing`, cells that already hold a value are skipped
/// and reported in a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValueOperation {
    selection: Selection,
    options: SetValueOptions,
}

impl SetValueOperation {
    /// Creates the operation, validating the options.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for a formula with an empty body.
    pub fn new(selection: Selection, options: SetValueOptions) -> BatchResult<Self> {
        if let CellValue::Formula(body) = &options.value {
            if body.trim().is_empty() {
                return Err(BatchError::invalid_operation("formula body is empty"));
            }
        }
        Ok(Self { selection, options })
    }

    /// The options this operation was built with.
    #[must_use]
    pub fn options(&self) -> &SetValueOptions {
        &self.options
    }
}

impl PlanCells for SetValueOperation {
    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn kind(&self) -> OperationKind {
        OperationKind::SetValue
    }

    fn plan(&self, _address: CellAddress, current: Option<&CellValue>) -> CellPlan {
        if current.is_some() && !self.options.overwrite_existing {
            return CellPlan::Skip;
        }
        CellPlan::Write(Some(self.options.value.clone()))
    }

    fn skip_warning(&self, skipped: usize) -> Option<String> {
        (skipped > 0 && !self.options.overwrite_existing).then(|| {
            format!("{skipped} cell(s) skipped: already hold a value and overwrite is off")
        })
    }
}
