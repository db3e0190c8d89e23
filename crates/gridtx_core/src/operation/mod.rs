//! Bulk operations.
//!
//! A bulk operation is a unit of work bound to one [`Selection`]. Every
//! variant decides, per cell, what value (if any) to write; previewing and
//! executing share that per-cell plan so a preview always matches what
//! execution would do against the same store contents.
//!
//! Variants:
//! - [`SetValueOperation`] - write a literal or formula across a selection
//! - [`ClearOperation`] - empty every cell in a selection
//! - [`ReplayOperation`] - drive cells to recorded before/after values
//!   (built by the undo/redo history only)

mod clear;
mod replay;
mod set_value;

pub use clear::ClearOperation;
pub use replay::{ReplayDirection, ReplayOperation};
pub use set_value::{SetValueOperation, SetValueOptions};

use crate::change::{CellChange, ChangeSet};
use crate::error::BatchResult;
use crate::result::{OperationMetadata, OperationPreview, OperationResult};
use crate::selection::Selection;
use crate::types::now_millis;
use gridtx_store::{CellAddress, CellStore, CellValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Default number of sample changes returned by a preview.
pub const DEFAULT_PREVIEW_LIMIT: usize = 100;

const BASE_COST: Duration = Duration::from_micros(50);
const PER_CELL_COST: Duration = Duration::from_micros(2);

/// Kind of bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Literal or formula write.
    SetValue,
    /// Clear contents.
    Clear,
    /// Replay of recorded before-values.
    UndoReplay,
    /// Replay of recorded after-values.
    RedoReplay,
    /// Several operations committed together.
    Batch,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetValue => "set-value",
            Self::Clear => "clear",
            Self::UndoReplay => "undo-replay",
            Self::RedoReplay => "redo-replay",
            Self::Batch => "batch",
        };
        f.write_str(name)
    }
}

/// What an operation intends to do with one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CellPlan {
    /// Leave the cell untouched.
    Skip,
    /// Drive the cell to this value (`None` empties it).
    Write(Option<CellValue>),
}

/// Per-cell planning shared by all variants.
pub(crate) trait PlanCells {
    fn selection(&self) -> &Selection;

    fn kind(&self) -> OperationKind;

    fn plan(&self, address: CellAddress, current: Option<&CellValue>) -> CellPlan;

    /// Warning to attach when `skipped` cells were left untouched.
    fn skip_warning(&self, _skipped: usize) -> Option<String> {
        None
    }
}

/// A unit of work over one selection.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Write a literal or formula value.
    SetValue(SetValueOperation),
    /// Clear cell contents.
    Clear(ClearOperation),
    /// Replay recorded changes (undo/redo only).
    Replay(ReplayOperation),
}

impl BulkOperation {
    /// Creates a value-setting operation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the options are invalid.
    pub fn set_value(selection: Selection, options: SetValueOptions) -> BatchResult<Self> {
        SetValueOperation::new(selection, options).map(Self::SetValue)
    }

    /// Creates a clear operation.
    #[must_use]
    pub fn clear(selection: Selection) -> Self {
        Self::Clear(ClearOperation::new(selection))
    }

    fn planner(&self) -> &dyn PlanCells {
        match self {
            Self::SetValue(op) => op,
            Self::Clear(op) => op,
            Self::Replay(op) => op,
        }
    }

    /// The cells this operation targets.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        self.planner().selection()
    }

    /// Kind of operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.planner().kind()
    }

    /// Returns why the operation cannot run, or `None` if it can.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.selection().is_empty() {
            return Some("empty selection".to_string());
        }
        None
    }

    /// Computes what `execute` would do without writing to `store`.
    ///
    /// At most `limit` sample changes are returned (default
    /// [`DEFAULT_PREVIEW_LIMIT`]); the counts always cover the whole
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn preview(
        &self,
        store: &dyn CellStore,
        limit: Option<usize>,
    ) -> BatchResult<OperationPreview> {
        let planner = self.planner();
        let limit = limit.unwrap_or(DEFAULT_PREVIEW_LIMIT);
        let mut changes = Vec::new();
        let mut total_changes = 0;
        let mut skipped = 0;
        let mut formula_cells = 0;

        for address in planner.selection() {
            let current = store.get(address)?;
            let target = match planner.plan(address, current.as_ref()) {
                CellPlan::Write(target) if target != current => target,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            total_changes += 1;
            if target.as_ref().is_some_and(CellValue::is_formula) {
                formula_cells += 1;
            }
            if changes.len() < limit {
                changes.push(
                    CellChange::new(address, current, target)
                        .with_metadata("operation", planner.kind().to_string()),
                );
            }
        }

        let warnings = planner.skip_warning(skipped).into_iter().collect();
        let errors = self.validate().into_iter().collect();
        Ok(OperationPreview {
            preview_count: changes.len(),
            is_truncated: changes.len() < total_changes,
            changes,
            total_changes,
            cells_modified: total_changes,
            cells_skipped: skipped,
            formula_cells,
            value_cells: total_changes - formula_cells,
            warnings,
            errors,
            estimated_time: self.estimate_time(),
        })
    }

    /// Applies the operation to `store`.
    ///
    /// The returned `actual_changes` records every cell that was altered and
    /// nothing else. Cells already holding the target value are counted as
    /// processed but not modified.
    ///
    /// # Errors
    ///
    /// Returns the first store error. Cells written before the error keep
    /// their new values; batch rollback is responsible for restoring them.
    pub fn execute(&self, store: &mut dyn CellStore) -> BatchResult<OperationResult> {
        let planner = self.planner();
        let started = Instant::now();
        let started_at_ms = now_millis();
        let mut actual_changes = ChangeSet::new();
        let mut processed = 0;

        for address in planner.selection() {
            processed += 1;
            let current = store.get(address)?;
            let target = match planner.plan(address, current.as_ref()) {
                CellPlan::Write(target) if target != current => target,
                _ => continue,
            };
            store.put(address, target.clone())?;
            let change = CellChange::new(address, current, target)
                .with_metadata("operation", planner.kind().to_string());
            actual_changes.insert(address, change);
        }

        let execution_time = started.elapsed();
        let skipped = processed - actual_changes.len();
        let secs = execution_time.as_secs_f64();
        let cells_per_second = if processed > 0 && secs > 0.0 {
            processed as f64 / secs
        } else {
            0.0
        };

        Ok(OperationResult {
            success: true,
            cells_modified: actual_changes.len(),
            cells_processed: processed,
            execution_time,
            errors: Vec::new(),
            warnings: planner.skip_warning(skipped).into_iter().collect(),
            actual_changes,
            metadata: OperationMetadata {
                operation_type: planner.kind(),
                started_at_ms,
                finished_at_ms: now_millis(),
                cells_per_second,
            },
        })
    }

    /// Rough execution time estimate, linear in selection size.
    #[must_use]
    pub fn estimate_time(&self) -> Duration {
        let cells = u32::try_from(self.selection().count()).unwrap_or(u32::MAX);
        BASE_COST + PER_CELL_COST * cells
    }

    /// Human-readable summary for history menus and logs.
    #[must_use]
    pub fn description(&self) -> String {
        let cells = self.selection().count();
        match self {
            Self::SetValue(op) => format!("Set \"{}\" in {} cell(s)", op.options().value, cells),
            Self::Clear(_) => format!("Clear {cells} cell(s)"),
            Self::Replay(op) => match op.direction() {
                ReplayDirection::Undo => format!("Undo changes to {cells} cell(s)"),
                ReplayDirection::Redo => format!("Redo changes to {cells} cell(s)"),
            },
        }
    }
}

impl From<SetValueOperation> for BulkOperation {
    fn from(op: SetValueOperation) -> Self {
        Self::SetValue(op)
    }
}

impl From<ClearOperation> for BulkOperation {
    fn from(op: ClearOperation) -> Self {
        Self::Clear(op)
    }
}

impl From<ReplayOperation> for BulkOperation {
    fn from(op: ReplayOperation) -> Self {
        Self::Replay(op)
    }
}
